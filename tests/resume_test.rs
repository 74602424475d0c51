mod common;
use basic::session::{Error, HostValue, Outcome, Session};
use std::fs;
use std::fs::File;
use std::path::Path;

const PROGRAM: &str = "
10 OPEN \"OUT\" FOR OUTPUT AS 1
20 FOR I=1 TO 5
30 PRINT#1, I;
40 IF I=3 THEN SYSTEM
50 NEXT
60 PRINT#1, \"DONE\"
70 CLOSE
";

fn session(dir: &Path) -> Session {
    Session::builder().mount('z', dir).build()
}

#[test]
fn test_resume_direct_mode() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("session.bin");
    let mut s = session(dir.path());
    let outcome = s
        .execute(r#"A=1:open"z:output.txt" for output as 1:SYSTEM"#)
        .unwrap();
    assert_eq!(outcome, Outcome::System);
    s.suspend(&snapshot).unwrap();
    drop(s);

    let mut s = Session::resume(&snapshot, None).unwrap();
    assert_eq!(s.execute("?#1,A:close:system").unwrap(), Outcome::System);
    drop(s);
    assert_eq!(
        fs::read(dir.path().join("OUTPUT.TXT")).unwrap(),
        b" 1 \r\n\x1a"
    );
}

#[test]
fn test_resume_mid_program() {
    let straight = tempfile::tempdir().unwrap();
    let mut s = session(straight.path());
    s.execute(PROGRAM).unwrap();
    assert_eq!(s.execute("RUN").unwrap(), Outcome::System);
    assert_eq!(s.execute("CONT").unwrap(), Outcome::Ready);
    drop(s);
    let expected = fs::read(straight.path().join("OUT")).unwrap();
    assert_eq!(expected, b" 1  2  3  4  5 DONE\r\n\x1a");

    let resumed = tempfile::tempdir().unwrap();
    let snapshot = resumed.path().join("session.bin");
    let mut s = session(resumed.path());
    s.execute(PROGRAM).unwrap();
    assert_eq!(s.execute("RUN").unwrap(), Outcome::System);
    s.suspend(&snapshot).unwrap();
    drop(s);
    assert_eq!(fs::read(resumed.path().join("OUT")).unwrap(), b"");

    let mut s = Session::resume(&snapshot, None).unwrap();
    assert!(s.can_continue());
    assert_eq!(s.get_variable("I!").unwrap(), HostValue::Float(3.0));
    assert_eq!(s.execute("CONT").unwrap(), Outcome::Ready);
    s.close().unwrap();
    assert_eq!(fs::read(resumed.path().join("OUT")).unwrap(), expected);
}

#[test]
fn test_resume_keeps_machine_state() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("session.bin");
    let mut straight = Session::builder().seed(3).build();
    let mut s = Session::builder().seed(3).build();
    for session in [&mut straight, &mut s].iter_mut() {
        session.execute("A$=\"KEPT\":DIM B%(3):B%(2)=7:PRINT \"X\";").unwrap();
        session.evaluate("RND(1)", None).unwrap();
    }
    let free = s.free();
    s.suspend(&snapshot).unwrap();
    let mut s = Session::resume(&snapshot, None).unwrap();
    assert_eq!(s.get_variable("A$").unwrap(), HostValue::Bytes(b"KEPT".to_vec()));
    assert_eq!(s.evaluate("B%(2)", None).unwrap(), HostValue::Int(7));
    assert_eq!(s.free(), free);
    assert_eq!(s.pos(), 2);
    assert_eq!(
        s.evaluate("RND(1)", None).unwrap(),
        straight.evaluate("RND(1)", None).unwrap()
    );
}

#[test]
fn test_resume_bound_path() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("session.bin");
    let path = dir.path().join("bound.txt");
    let mut s = Session::new();
    let name = s.bind_file(path.clone(), true).unwrap();
    s.execute(format!(r#"open "{}" for output as 1:print#1,"a""#, name))
        .unwrap();
    s.suspend(&snapshot).unwrap();
    drop(s);

    let mut s = Session::resume(&snapshot, None).unwrap();
    s.execute(r#"print#1,"b":close"#).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"a\r\nb\r\n\x1a");
}

#[test]
fn test_suspend_refuses_open_handle() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("session.bin");
    let path = dir.path().join("handle.txt");
    let mut s = Session::new();
    let name = s.bind_file(File::create(&path).unwrap(), false).unwrap();
    s.execute(format!(r#"open "{}" for output as 1"#, name)).unwrap();
    assert!(matches!(s.suspend(&snapshot), Err(Error::Resource { .. })));
    assert!(!snapshot.exists());
    assert!(!s.is_closed());
    s.execute(r#"print#1,"x":close"#).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"x\r\n\x1a");
    s.suspend(&snapshot).unwrap();
    assert!(snapshot.exists());
}

#[test]
fn test_suspended_session_is_spent() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("session.bin");
    let mut s = Session::new();
    s.suspend(&snapshot).unwrap();
    assert!(matches!(s.execute("A=1"), Err(Error::Usage(_))));
    assert!(matches!(s.suspend(&snapshot), Err(Error::Usage(_))));
}

#[test]
fn test_resume_rejects_bad_records() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("session.bin");
    let mut s = Session::new();
    s.execute("10 A=1").unwrap();
    s.suspend(&snapshot).unwrap();
    let record = fs::read(&snapshot).unwrap();

    let mut bad_version = record.clone();
    bad_version[8] = bad_version[8].wrapping_add(1);
    fs::write(&snapshot, &bad_version).unwrap();
    assert!(matches!(
        Session::resume(&snapshot, None),
        Err(Error::Resource { .. })
    ));

    let mut bad_payload = record.clone();
    let last = bad_payload.len() - 1;
    bad_payload[last] ^= 0x55;
    fs::write(&snapshot, &bad_payload).unwrap();
    assert!(matches!(
        Session::resume(&snapshot, None),
        Err(Error::Resource { .. })
    ));

    assert!(matches!(
        Session::resume(dir.path().join("missing.bin"), None),
        Err(Error::Resource { .. })
    ));

    fs::write(&snapshot, &record).unwrap();
    assert!(Session::resume(&snapshot, None).is_ok());
}
