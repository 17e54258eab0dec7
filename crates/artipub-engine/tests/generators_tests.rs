#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::time::{Duration, Instant};

use artipub_core::errors::ExErrorKind;
use artipub_core::generator::ArtifactGenerator;
use artipub_engine::{CommandGenerator, DirectoryGenerator};

#[test]
fn test_directory_generator_reads_tree() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("maps")).unwrap();
    fs::write(dir.path().join("settings.json"), "{\"v\":1}").unwrap();
    fs::write(dir.path().join("maps/a.bin"), [0u8, 1, 2]).unwrap();

    let generator = DirectoryGenerator::new(dir.path());
    let set = generator.generate().unwrap();

    assert_eq!(set.len(), 2);
    assert_eq!(set.get("settings.json"), Some(&b"{\"v\":1}"[..]));
    assert_eq!(set.get("maps/a.bin"), Some(&[0u8, 1, 2][..]));
    assert!(generator.describe().starts_with("directory("));
}

#[test]
fn test_directory_generator_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.json"), "1").unwrap();

    let generator = DirectoryGenerator::new(dir.path());
    assert_eq!(generator.generate().unwrap(), generator.generate().unwrap());

    fs::write(dir.path().join("a.json"), "2").unwrap();
    assert_eq!(generator.generate().unwrap().get("a.json"), Some(&b"2"[..]));
}

#[test]
fn test_directory_generator_include_prefix() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("maps")).unwrap();
    fs::write(dir.path().join("maps/a.json"), "a").unwrap();
    fs::write(dir.path().join("maps/b.json"), "b").unwrap();
    fs::write(dir.path().join("scratch.tmp"), "x").unwrap();

    let generator = DirectoryGenerator::new(dir.path()).with_include(vec!["maps".to_string()]);
    let set = generator.generate().unwrap();
    let names: Vec<&str> = set.names().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["maps/a.json", "maps/b.json"]);
}

#[test]
fn test_directory_generator_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let err = DirectoryGenerator::new(dir.path().join("absent"))
        .generate()
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::GeneratorError);
}

#[cfg(unix)]
#[test]
fn test_directory_generator_follows_symlinks() {
    let target = tempfile::tempdir().unwrap();
    fs::write(target.path().join("linked.json"), "L").unwrap();

    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(target.path(), dir.path().join("ext")).unwrap();

    let set = DirectoryGenerator::new(dir.path()).generate().unwrap();
    assert_eq!(set.get("ext/linked.json"), Some(&b"L"[..]));
}

#[cfg(unix)]
mod command {
    use super::*;

    fn sh(script: &str) -> CommandGenerator {
        CommandGenerator::new("sh").with_args(vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_collects_files_written_to_output_dir() {
        let generator = sh(
            "mkdir -p \"$ARTIPUB_OUTPUT_DIR/sub\" && printf 1 > \"$ARTIPUB_OUTPUT_DIR/a.json\" && printf 2 > sub/b.json",
        );
        let set = generator.generate().unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a.json"), Some(&b"1"[..]));
        assert_eq!(set.get("sub/b.json"), Some(&b"2"[..]));
    }

    #[test]
    fn test_stdout_is_not_an_artifact() {
        let set = sh("echo noise; printf x > out.txt").generate().unwrap();
        let names: Vec<&str> = set.names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["out.txt"]);
    }

    #[test]
    fn test_each_call_starts_clean() {
        let generator = sh("ls > listing.txt");
        let first = generator.generate().unwrap();
        let second = generator.generate().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.get("listing.txt"), Some(&b"listing.txt\n"[..]));
    }

    #[test]
    fn test_non_zero_exit_carries_stderr_tail() {
        let err = sh("echo 'settings file is corrupt' >&2; exit 3")
            .generate()
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::GeneratorError);
        assert!(
            err.message().contains("settings file is corrupt"),
            "message: {}",
            err.message()
        );
    }

    #[test]
    fn test_deadline_kills_program() {
        let generator = sh("sleep 5").with_timeout(Duration::from_millis(200));
        let start = Instant::now();
        let err = generator.generate().unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::GeneratorTimeout);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_unbounded_deadline_does_not_overflow() {
        let set = sh("printf 1 > a.json")
            .with_timeout(Duration::MAX)
            .generate()
            .unwrap();
        assert!(set.contains("a.json"));
    }

    #[test]
    fn test_include_restricts_and_requires_outputs() {
        let generator = sh("printf '{}' > mod_settings_data.json; printf log > run.log")
            .with_include(vec!["mod_settings_data.json".to_string()]);
        let set = generator.generate().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("mod_settings_data.json"));

        let err = sh("true")
            .with_include(vec!["mod_settings_data.json".to_string()])
            .generate()
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::GeneratorError);
        assert_eq!(err.entity_id(), Some("mod_settings_data.json"));
    }

    #[test]
    fn test_staged_script_runs_and_is_not_collected() {
        let src = tempfile::tempdir().unwrap();
        let script = src.path().join("gen.sh");
        fs::write(&script, "printf \"$GREETING\" > hello.txt\n").unwrap();

        let generator = CommandGenerator::new("sh")
            .with_args(vec!["gen.sh".to_string()])
            .with_stage(vec![script])
            .with_env("GREETING", "hi");
        let set = generator.generate().unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("hello.txt"), Some(&b"hi"[..]));
    }

    #[test]
    fn test_missing_staged_file_is_generator_error() {
        let src = tempfile::tempdir().unwrap();
        let err = CommandGenerator::new("sh")
            .with_stage(vec![src.path().join("absent.py")])
            .generate()
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::GeneratorError);
    }
}
