mod common;
use basic::mach::Runtime;
use common::*;

#[test]
fn test_breaking_out_of_for_loop_with_goto() {
    let mut r = Runtime::default();
    r.enter(r#"10fory=1to2"#);
    r.enter(r#"20forx=8to9"#);
    r.enter(r#"30?y;x"#);
    r.enter(r#"40goto60"#);
    r.enter(r#"50next"#);
    r.enter(r#"60nexty"#);
    r.enter(r#"run"#);
    assert_eq!(exec(&mut r), " 1  8 \n 2  8 \n");
}

#[test]
fn test_for_loop_skips_body_past_limit() {
    let mut r = Runtime::default();
    r.enter(r#"FOR I=3 TO 0:PRINT I:NEXT I:PRINT "DONE";I"#);
    assert_eq!(exec(&mut r), "DONE 3 \n");
    r.enter(r#"FOR I=1 TO 3 STEP -1:PRINT I:NEXT:PRINT "DOWN""#);
    assert_eq!(exec(&mut r), "DOWN\n");
}

#[test]
fn test_for_loop_skip_passes_nested_loops() {
    let mut r = Runtime::default();
    r.enter(r#"10 FOR I=5 TO 1"#);
    r.enter(r#"20 FOR J=1 TO 2:PRINT "J";:NEXT J"#);
    r.enter(r#"30 NEXT I"#);
    r.enter(r#"40 PRINT "END""#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "END\n");
}

#[test]
fn test_for_without_next() {
    let mut r = Runtime::default();
    r.enter(r#"10 FOR I=5 TO 1"#);
    r.enter(r#"20 PRINT I"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "?FOR WITHOUT NEXT IN 10\n");
}

#[test]
fn test_for_loop_assign_step_after_var() {
    let mut r = Runtime::default();
    r.enter(r#"I=1:FOR I=3 TO 9 STEP I:PRINT I;:NEXT"#);
    assert_eq!(exec(&mut r), " 3  6  9 ");
}

#[test]
fn test_for_loop_counting_down() {
    let mut r = Runtime::default();
    r.enter(r#"FOR I=3 TO 1 STEP -1:PRINT I;:NEXT:PRINT"#);
    assert_eq!(exec(&mut r), " 3  2  1 \n");
}

#[test]
fn test_next_without_for() {
    let mut r = Runtime::default();
    r.enter(r#"10 NEXT"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "?NEXT WITHOUT FOR IN 10\n");
}

#[test]
fn test_if_then() {
    let mut r = Runtime::default();
    r.enter(r#"if 1 then ? "one""#);
    assert_eq!(exec(&mut r), "one\n");
}

#[test]
fn test_if_then_else() {
    let mut r = Runtime::default();
    r.enter(r#"if 0 then ? "one" else ? "two";:?2"#);
    assert_eq!(exec(&mut r), "two 2 \n");
    r.enter(r#"if 1 then ? "one" else ? "two":?2"#);
    assert_eq!(exec(&mut r), "one\n");
    r.enter(r#"if 1 then ? "one";:?2"#);
    assert_eq!(exec(&mut r), "one 2 \n");
    r.enter(r#"if 0 then ? "one";:?2"#);
    assert_eq!(exec(&mut r), "");
}

#[test]
fn test_if_then_line_number() {
    let mut r = Runtime::default();
    r.enter(r#"10 IF A=0 THEN 30"#);
    r.enter(r#"20 PRINT "NO""#);
    r.enter(r#"30 PRINT "YES""#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "YES\n");
}

#[test]
fn test_gosub_return() {
    let mut r = Runtime::default();
    r.enter(r#"10 GOSUB 100"#);
    r.enter(r#"20 PRINT "WORLD""#);
    r.enter(r#"90 END"#);
    r.enter(r#"100 PRINT "HELLO ";"#);
    r.enter(r#"110 RETURN"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "HELLO WORLD\n");
}

#[test]
fn test_return_without_gosub() {
    let mut r = Runtime::default();
    r.enter(r#"10 RETURN"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "?RETURN WITHOUT GOSUB IN 10\n");
}

#[test]
fn test_end_cont() {
    let mut r = Runtime::default();
    r.enter(r#"10 A=1"#);
    r.enter(r#"20 END"#);
    r.enter(r#"30 PRINT A"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "");
    r.enter(r#"CONT"#);
    assert_eq!(exec(&mut r), " 1 \n");
}

#[test]
fn test_stop_cont() {
    let mut r = Runtime::default();
    r.enter(r#"10 A=1"#);
    r.enter(r#"20 STOP"#);
    r.enter(r#"30 PRINT A"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), "");
    assert!(r.can_continue());
    r.enter(r#"CONT"#);
    assert_eq!(exec(&mut r), " 1 \n");
    r.enter(r#"CONT"#);
    assert_eq!(exec(&mut r), "?CAN'T CONTINUE\n");
}

#[test]
fn test_editing_listing_forgets_cont() {
    let mut r = Runtime::default();
    r.enter(r#"10 STOP"#);
    r.enter(r#"RUN"#);
    exec(&mut r);
    assert!(r.can_continue());
    r.enter(r#"20 PRINT 2"#);
    assert!(!r.can_continue());
}

#[test]
fn test_run_clears_variables() {
    let mut r = Runtime::default();
    r.enter(r#"10 PRINT A"#);
    r.enter(r#"A=5:RUN"#);
    assert_eq!(exec(&mut r), " 0 \n");
}

#[test]
fn test_run_from_line() {
    let mut r = Runtime::default();
    r.enter(r#"10 PRINT 10;"#);
    r.enter(r#"20 PRINT 20"#);
    r.enter(r#"RUN 20"#);
    assert_eq!(exec(&mut r), " 20 \n");
}

#[test]
fn test_clear_keeps_program() {
    let mut r = Runtime::default();
    r.enter(r#"10 PRINT A"#);
    r.enter(r#"A=5:CLEAR:PRINT A"#);
    assert_eq!(exec(&mut r), " 0 \n");
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), " 0 \n");
}

#[test]
fn test_deleting_line() {
    let mut r = Runtime::default();
    r.enter(r#"10 PRINT 10"#);
    r.enter(r#"20 PRINT 20"#);
    r.enter(r#"10"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), " 20 \n");
}

#[test]
fn test_undefined_line() {
    let mut r = Runtime::default();
    r.enter(r#"10 GOTO 100"#);
    r.enter(r#"RUN"#);
    assert!(exec(&mut r).starts_with("?UNDEFINED LINE IN 10"));
}

#[test]
fn test_dim() {
    let mut r = Runtime::default();
    r.enter(r#"DIM A(20):A(20)=5:PRINT A(20)"#);
    assert_eq!(exec(&mut r), " 5 \n");
    r.enter(r#"DIM A(5)"#);
    assert!(exec(&mut r).starts_with("?REDIMENSIONED ARRAY"));
    r.enter(r#"PRINT B(11)"#);
    assert!(exec(&mut r).starts_with("?SUBSCRIPT OUT OF RANGE"));
}

#[test]
fn test_print_zones() {
    let mut r = Runtime::default();
    r.enter(r#"PRINT 1,2"#);
    assert_eq!(exec(&mut r), " 1             2 \n");
}

#[test]
fn test_rem() {
    let mut r = Runtime::default();
    r.enter(r#"PRINT 1:REM PRINT 2"#);
    assert_eq!(exec(&mut r), " 1 \n");
    r.enter(r#"PRINT 3:' PRINT 4"#);
    assert_eq!(exec(&mut r), " 3 \n");
}

#[test]
fn test_system_stops_program() {
    let mut r = Runtime::default();
    r.enter(r#"10 PRINT 1;:SYSTEM"#);
    r.enter(r#"20 PRINT 2"#);
    r.enter(r#"RUN"#);
    assert_eq!(exec(&mut r), " 1 ");
    assert!(r.can_continue());
    r.enter(r#"CONT"#);
    assert_eq!(exec(&mut r), " 2 \n");
}
