mod common;
use basic::session::{Extension, HostValue, Session};
use common::*;

fn number(value: &HostValue) -> Option<f64> {
    match value {
        HostValue::Int(n) => Some(*n as f64),
        HostValue::Float(n) => Some(*n),
        _ => None,
    }
}

#[test]
fn test_extension() {
    let extension = Extension::new().function("add", |args| match args {
        [x, y] => {
            let sum = number(x).unwrap_or(0.0) + number(y).unwrap_or(0.0);
            let show = |v: &HostValue| match v {
                HostValue::Int(n) => format!("{}", n),
                HostValue::Float(n) => format!("{:?}", n),
                other => format!("{:?}", other),
            };
            Ok(format!("{} plus {} equals {:?}", show(x), show(y), sum))
        }
        _ => Err("add takes two arguments".into()),
    });
    let mut s = Session::builder().extension(extension).build();
    s.execute(
        "
        10 a=5
        run
        b$ = _add(a, 1)
    ",
    )
    .unwrap();
    assert_eq!(s.get_variable("a!").unwrap(), HostValue::Float(5.0));
    assert_eq!(
        s.get_variable("b$").unwrap(),
        HostValue::Bytes(b"5.0 plus 1 equals 6.0".to_vec())
    );
}

#[test]
fn test_extended_session() {
    let extension = Extension::new().method("adda", |scope, args| {
        let a = number(&scope.get_variable("a!")?).unwrap_or(0.0);
        match args {
            [x] => Ok(number(x).unwrap_or(0.0) + a),
            _ => Err("adda takes one argument".into()),
        }
    });
    let mut s = Session::builder().extension(extension).build();
    s.execute("a=4").unwrap();
    s.execute("b=_adda(1)").unwrap();
    assert_eq!(s.evaluate("b", None).unwrap(), HostValue::Float(5.0));
}

#[test]
fn test_extension_keeps_state() {
    let mut total = 0i64;
    let extension = Extension::new().function("tally", move |args| {
        for arg in args {
            if let HostValue::Int(n) = arg {
                total += n;
            }
        }
        Ok(total)
    });
    let mut s = Session::builder().extension(extension).build();
    s.execute("10 FOR I%=1 TO 4:T=_TALLY(I%):NEXT").unwrap();
    s.execute("RUN").unwrap();
    assert_eq!(s.get_variable("T!").unwrap(), HostValue::Float(10.0));
}

#[test]
fn test_extension_statement() {
    let extension = Extension::new().method("store", |scope, args| {
        scope.set_variable("R%", args.len() as i64)?;
        Ok(HostValue::Int(0))
    });
    let mut s = Session::builder().extension(extension).build();
    s.execute("_STORE 1, 2, \"three\"").unwrap();
    assert_eq!(s.get_variable("R%").unwrap(), HostValue::Int(3));
}

#[test]
fn test_extension_errors() {
    let extension = Extension::new()
        .function("fail", |_| -> Result<HostValue, _> { Err("no good".into()) })
        .function("_private", |_| Ok(HostValue::Int(1)));
    let mut s = Session::builder().extension(extension).build();
    assert_eq!(run(&mut s, "a=_fail(1)"), "?ILLEGAL FUNCTION CALL; no good\n");
    assert_eq!(run(&mut s, "a=_private(1)"), "?UNDEFINED USER FUNCTION\n");
    assert_eq!(run(&mut s, "a=_missing"), "?UNDEFINED USER FUNCTION\n");
}

#[test]
fn test_no_extension() {
    let mut s = Session::new();
    assert_eq!(s.execute("a=_add(1,2)").unwrap_err().code(), Some(18));
}
