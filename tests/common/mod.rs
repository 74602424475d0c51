#![allow(dead_code)]

use basic::mach::{Event, Runtime};
use basic::session::Session;

pub fn exec(runtime: &mut Runtime) -> String {
    exec_n(runtime, 5000)
}

pub fn exec_n(runtime: &mut Runtime, cycles: usize) -> String {
    let mut s = String::new();
    let mut prev_running = false;
    loop {
        let event = runtime.execute(cycles);
        s.push_str(&runtime.take_output());
        match &event {
            Event::Stopped | Event::System => {
                break;
            }
            Event::Errors(errors) => {
                for error in errors.iter() {
                    s.push_str(&format!("?{}\n", error));
                }
            }
            Event::Running => {
                if prev_running {
                    s.push_str(&format!("\n{} Execution cycles exceeded.\n", cycles));
                    break;
                }
            }
        }
        match event {
            Event::Running => prev_running = true,
            _ => prev_running = false,
        }
    }
    s
}

/// Run text in a session and return what it printed, or the error.
pub fn run(session: &mut Session, text: &str) -> String {
    match session.execute(text) {
        Ok(_) => session.take_output(),
        Err(e) => format!("{}?{}\n", session.take_output(), e),
    }
}
