//! End-to-end behaviour of a single golden test file against stand-in lev scripts.

use lev_golden::{Mismatch, TestFile, TestOutcome, Whitespace};
use test_utils::{
    cleanup_dir, echo_script, lev_source, read_text, source_echo_lev, temp_workspace,
    write_lev_script, write_test_file,
};

const SCENARIO: &str = "// RUN-ARGS: --flag\n1\n2\n// CHECK-STDOUT: 1\n// CHECK-STDOUT: 2";

#[test]
fn matching_output_passes() {
    let ws = temp_workspace("golden-pass").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", &echo_script!["1", "2"]).unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").expect("load");
    let outcome = test.run_test(&lev, &ws, Whitespace::Exact).expect("run");
    assert_eq!(outcome, TestOutcome::Passed);

    cleanup_dir(&ws).unwrap();
}

#[test]
fn differing_line_reports_its_file_line() {
    let ws = temp_workspace("golden-mismatch").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", &echo_script!["1", "3"]).unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").expect("load");
    let outcome = test.run_test(&lev, &ws, Whitespace::Exact).expect("run");
    assert_eq!(
        outcome,
        TestOutcome::Failed(Mismatch {
            index: 1,
            line_number: 5,
            expected: Some("2".into()),
            actual: Some("3".into()),
        })
    );

    cleanup_dir(&ws).unwrap();
}

#[test]
fn extra_output_line_is_a_failure() {
    let ws = temp_workspace("golden-extra").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", &echo_script!["1", "2", "surprise"]).unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").unwrap();
    match test.run_test(&lev, &ws, Whitespace::Exact).unwrap() {
        TestOutcome::Failed(mismatch) => {
            assert_eq!(mismatch.line_number, 6);
            assert_eq!(mismatch.expected, None);
            assert_eq!(mismatch.actual.as_deref(), Some("surprise"));
        }
        TestOutcome::Passed => panic!("extra output should not pass"),
    }

    cleanup_dir(&ws).unwrap();
}

#[test]
fn missing_run_args_fails_before_launching_lev() {
    let ws = temp_workspace("golden-noargs").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", "touch invoked\n").unwrap();
    let path = write_test_file(&ws, "case.lev", &lev_source!["1", "// CHECK-STDOUT: 1"]).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").unwrap();
    let err = test.run_test(&lev, &ws, Whitespace::Exact).unwrap_err();
    assert!(err.to_string().contains("has no run args"), "{err:#}");
    assert!(!ws.join("invoked").exists(), "lev must not be started");

    cleanup_dir(&ws).unwrap();
}

#[test]
fn nonzero_exit_is_an_error() {
    let ws = temp_workspace("golden-exit").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", "echo 1\nexit 3\n").unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").unwrap();
    let err = test.run_test(&lev, &ws, Whitespace::Exact).unwrap_err();
    assert!(err.to_string().contains("failed for tests/case.lev"), "{err:#}");

    cleanup_dir(&ws).unwrap();
}

#[test]
fn stderr_is_not_compared() {
    let ws = temp_workspace("golden-stderr").expect("workspace");
    let body = format!("echo noise >&2\n{}", echo_script!["1", "2"]);
    let lev = write_lev_script(&ws, "lev.sh", &body).unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").unwrap();
    assert!(test.run_test(&lev, &ws, Whitespace::Exact).unwrap().is_pass());

    cleanup_dir(&ws).unwrap();
}

#[test]
fn run_args_and_path_reach_lev() {
    let ws = temp_workspace("golden-args").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", "echo \"$1\"\nbasename \"$2\"\n").unwrap();
    let text = lev_source![
        "// RUN-ARGS: --emit-ir",
        "// CHECK-STDOUT: --emit-ir",
        "// CHECK-STDOUT: my case.lev",
    ];
    let path = write_test_file(&ws, "my case.lev", &text).unwrap();

    let test = TestFile::load(&path, "tests/my case.lev").unwrap();
    assert!(test.run_test(&lev, &ws, Whitespace::Exact).unwrap().is_pass());

    cleanup_dir(&ws).unwrap();
}

#[test]
fn trim_mode_ignores_surrounding_whitespace() {
    let ws = temp_workspace("golden-trim").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", &echo_script!["  1  ", "2\t"]).unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    let test = TestFile::load(&path, "tests/case.lev").unwrap();
    assert!(!test.run_test(&lev, &ws, Whitespace::Exact).unwrap().is_pass());
    assert!(test.run_test(&lev, &ws, Whitespace::Trim).unwrap().is_pass());

    cleanup_dir(&ws).unwrap();
}

#[test]
fn missing_file_is_an_error() {
    let ws = temp_workspace("golden-missing").expect("workspace");
    let err = TestFile::load(ws.join("tests/nope.lev"), "tests/nope.lev").unwrap_err();
    assert!(err.to_string().contains("could not open test file"), "{err:#}");
    cleanup_dir(&ws).unwrap();
}

#[test]
fn update_replaces_expectations_and_keeps_source() {
    let ws = temp_workspace("golden-update").expect("workspace");
    let lev = source_echo_lev(&ws).unwrap();
    let text = lev_source![
        "// RUN-ARGS: --run",
        "a",
        "b",
        "// CHECK-STDOUT: stale",
        "// CHECK-STDOUT: also stale",
        "// CHECK-STDOUT: and more",
    ];
    let path = write_test_file(&ws, "case.lev", &text).unwrap();

    let mut test = TestFile::load(&path, "tests/case.lev").unwrap();
    test.update_expected_lines(&lev, &ws, Whitespace::Exact).unwrap();

    let expected = lev_source![
        "// RUN-ARGS: --run",
        "a",
        "b",
        "// CHECK-STDOUT: a",
        "// CHECK-STDOUT: b",
    ];
    assert_eq!(read_text(&path).unwrap(), expected);
    assert_eq!(test.lines().concat(), expected);
    assert!(!ws.join("tests/.case.lev.tmp").exists());

    cleanup_dir(&ws).unwrap();
}

#[test]
fn update_terminates_unterminated_source() {
    let ws = temp_workspace("golden-newline").expect("workspace");
    let lev = source_echo_lev(&ws).unwrap();
    let path = write_test_file(&ws, "case.lev", "// RUN-ARGS:\nlast").unwrap();

    let mut test = TestFile::load(&path, "tests/case.lev").unwrap();
    test.update_expected_lines(&lev, &ws, Whitespace::Exact).unwrap();
    assert_eq!(
        read_text(&path).unwrap(),
        "// RUN-ARGS:\nlast\n// CHECK-STDOUT: last\n"
    );

    cleanup_dir(&ws).unwrap();
}

#[test]
fn update_is_idempotent() {
    let ws = temp_workspace("golden-idem").expect("workspace");
    let lev = source_echo_lev(&ws).unwrap();
    let path = write_test_file(&ws, "case.lev", SCENARIO).unwrap();

    TestFile::load(&path, "tests/case.lev")
        .unwrap()
        .update_expected_lines(&lev, &ws, Whitespace::Exact)
        .unwrap();
    let first = read_text(&path).unwrap();
    TestFile::load(&path, "tests/case.lev")
        .unwrap()
        .update_expected_lines(&lev, &ws, Whitespace::Exact)
        .unwrap();
    assert_eq!(read_text(&path).unwrap(), first);

    cleanup_dir(&ws).unwrap();
}

#[test]
fn update_then_run_passes() {
    let ws = temp_workspace("golden-roundtrip").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", &echo_script![" leading", "", "x = 1;"]).unwrap();
    let path = write_test_file(&ws, "case.lev", &lev_source!["// RUN-ARGS: -O"]).unwrap();

    TestFile::load(&path, "tests/case.lev")
        .unwrap()
        .update_expected_lines(&lev, &ws, Whitespace::Exact)
        .unwrap();
    let test = TestFile::load(&path, "tests/case.lev").unwrap();
    assert_eq!(test.source_end_line(), 1);
    assert_eq!(
        test.parse_expected_lines(Whitespace::Exact),
        vec![" leading", "", "x = 1;"]
    );
    assert!(test.run_test(&lev, &ws, Whitespace::Exact).unwrap().is_pass());

    cleanup_dir(&ws).unwrap();
}

#[test]
fn blank_line_splitting_check_block_is_rejected() {
    let ws = temp_workspace("golden-split").expect("workspace");
    let text = "// RUN-ARGS:\n// CHECK-STDOUT: 1\n\n// CHECK-STDOUT: 2\n";
    let path = write_test_file(&ws, "case.lev", text).unwrap();

    let err = TestFile::load(&path, "tests/case.lev").unwrap_err();
    assert!(err.to_string().contains("tests/case.lev:3"), "{err:#}");

    cleanup_dir(&ws).unwrap();
}

#[test]
fn lev_receives_workspace_relative_path() {
    let ws = temp_workspace("golden-relpath").expect("workspace");
    let lev = write_lev_script(&ws, "lev.sh", "for last; do :; done\necho \"$last\"\n").unwrap();
    let path = write_test_file(&ws, "case.lev", &lev_source!["// RUN-ARGS: -v"]).unwrap();

    TestFile::load(&path, "tests/case.lev")
        .unwrap()
        .update_expected_lines(&lev, &ws, Whitespace::Exact)
        .unwrap();
    assert_eq!(
        read_text(&path).unwrap(),
        lev_source!["// RUN-ARGS: -v", "// CHECK-STDOUT: tests/case.lev"]
    );

    cleanup_dir(&ws).unwrap();
}
