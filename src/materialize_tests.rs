//! End-to-end materialization against real files.

mod tests {
    use crate::error::{ExtractError, MaterializeError};
    use crate::materialize::{MaterializeOptions, Materializer, Mode};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn checker() -> Materializer {
        Materializer::new(MaterializeOptions {
            mode: Mode::Check,
            ..MaterializeOptions::default()
        })
    }

    #[test]
    fn test_exact_output_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "sample.ts",
            "export type Y = string\nexport const x = { b: [1, 2, 3], a: 1 }\n",
        );

        let conversion = Materializer::default().convert(&input).unwrap();
        assert_eq!(conversion.output, dir.path().join("sample.json"));
        assert_eq!(conversion.keys, 1);
        assert!(conversion.changed);

        let written = fs::read_to_string(&conversion.output).unwrap();
        assert_eq!(
            written,
            "{\n    \"x\": {\n        \"a\": 1,\n        \"b\": [\n            1,\n            2,\n            3\n        ]\n    }\n}"
        );
        // The source is left alone.
        assert!(fs::read_to_string(&input).unwrap().contains("type Y"));
    }

    #[test]
    fn test_second_run_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "lessons.ts", "export const ids = [3, 1, 2]\n");
        let materializer = Materializer::default();

        let first = materializer.convert(&input).unwrap();
        let before = fs::read(&first.output).unwrap();
        let second = materializer.convert(&input).unwrap();
        let after = fs::read(&second.output).unwrap();

        assert_eq!(before, after);
        assert!(!second.changed);
    }

    #[test]
    fn test_stale_output_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "user.ts", "export const name = 'yarik'\n");
        write(dir.path(), "user.json", "{ \"old\": true }");

        let conversion = Materializer::default().convert(&input).unwrap();
        assert!(conversion.changed);
        assert_eq!(
            fs::read_to_string(dir.path().join("user.json")).unwrap(),
            "{\n    \"name\": \"yarik\"\n}"
        );
    }

    #[test]
    fn test_failures_are_isolated_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.ts", "export const ok = true\n");
        let broken = write(dir.path(), "broken.ts", "export const = {\n");
        let throws = write(dir.path(), "throws.ts", "export const now = Date.now()\n");
        let missing = dir.path().join("missing.ts");
        let wrong_suffix = write(dir.path(), "notes.txt", "hello");

        let report = Materializer::default().run(&[
            missing.clone(),
            broken.clone(),
            good.clone(),
            throws.clone(),
            wrong_suffix.clone(),
        ]);

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 4);
        assert!(!report.is_success());
        assert_eq!(
            fs::read_to_string(dir.path().join("good.json")).unwrap(),
            "{\n    \"ok\": true\n}"
        );

        let paths: Vec<&Path> = report.outcomes.iter().map(|o| o.path.as_path()).collect();
        assert_eq!(paths, vec![&*missing, &*broken, &*good, &*throws, &*wrong_suffix]);

        let errors: Vec<&MaterializeError> = report.failures().collect();
        assert!(matches!(errors[0], MaterializeError::Read { .. }));
        assert!(matches!(errors[1], MaterializeError::Parse { .. }));
        assert!(matches!(
            errors[2],
            MaterializeError::Extract {
                source: ExtractError::UnsupportedExpression { .. },
                ..
            }
        ));
        assert!(matches!(errors[3], MaterializeError::UnsupportedSuffix { .. }));

        assert!(!dir.path().join("broken.json").exists());
        assert!(!dir.path().join("throws.json").exists());
    }

    #[test]
    fn test_unwritable_output_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = write(dir.path(), "blocked.ts", "export const a = 1\n");
        let fine = write(dir.path(), "fine.ts", "export const b = 2\n");
        fs::create_dir(dir.path().join("blocked.json")).unwrap();

        let err = Materializer::default().convert(&blocked).unwrap_err();
        assert!(matches!(err, MaterializeError::Write { .. }));
        assert_eq!(err.path(), dir.path().join("blocked.json"));

        let report = Materializer::default().run(&[blocked.clone(), fine.clone()]);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.outcomes[0].path, blocked);
        assert!(matches!(
            report.outcomes[0].result,
            Err(MaterializeError::Write { .. })
        ));
        assert_eq!(report.outcomes[1].path, fine);
        assert_eq!(
            fs::read_to_string(dir.path().join("fine.json")).unwrap(),
            "{\n    \"b\": 2\n}"
        );
    }

    #[test]
    fn test_directory_inputs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.ts", "export const a = 1\n");
        write(dir.path(), "nested/b.mts", "export const b = 2\n");
        write(dir.path(), "types.d.ts", "export declare const c: number\n");

        let report = Materializer::default().run(&[dir.path().to_path_buf()]);
        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 2);
        assert!(dir.path().join("a.json").exists());
        assert!(dir.path().join("nested/b.json").exists());
        assert!(!dir.path().join("types.d.json").exists());
    }

    #[test]
    fn test_check_mode() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "task.ts", "export const task = { name: 'read' }\n");

        let err = checker().check(&input).unwrap_err();
        assert!(matches!(err, MaterializeError::Stale { .. }));
        assert!(!dir.path().join("task.json").exists());

        Materializer::default().convert(&input).unwrap();
        assert!(checker().check(&input).is_ok());

        write(dir.path(), "task.ts", "export const task = { name: 'write' }\n");
        let report = checker().run(&[input.clone()]);
        assert_eq!(report.failed(), 1);
        // Outcomes name the input even when the output is what went wrong.
        assert_eq!(report.outcomes[0].path, input);
    }

    #[test]
    fn test_custom_indent() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "flags.ts", "export const on = [true]\n");
        let materializer = Materializer::new(MaterializeOptions {
            indent: 2,
            ..MaterializeOptions::default()
        });

        materializer.convert(&input).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("flags.json")).unwrap(),
            "{\n  \"on\": [\n    true\n  ]\n}"
        );
    }

    #[test]
    fn test_relative_value_imports() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "common.ts",
            "export type UUID = string\nexport const teacherId: UUID = 'b69bd87e'\n",
        );
        write(dir.path(), "data/rooms.json", "[\"A1\", \"B2\"]");
        write(
            dir.path(),
            "lessons/index.ts",
            "export { teacherId } from '../common'\nexport const title = 'Algebra'\n",
        );
        let input = write(
            dir.path(),
            "examples.ts",
            r#"
            import { teacherId } from "./common.js"
            import rooms from "./data/rooms.json"
            import * as lessons from "./lessons"
            export const lesson = { ...lessons, teacher_id: teacherId, room: rooms[0] }
            "#,
        );

        Materializer::default().convert(&input).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("examples.json")).unwrap())
                .unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "lesson": {
                    "room": "A1",
                    "teacherId": "b69bd87e",
                    "teacher_id": "b69bd87e",
                    "title": "Algebra"
                }
            })
        );
        // Imported modules are evaluated, not materialized.
        assert!(!dir.path().join("common.json").exists());
    }

    #[test]
    fn test_import_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.ts", "import { b } from './b'\nexport const a = b\n");
        write(dir.path(), "b.ts", "import { a } from './a'\nexport const b = a\n");

        let err = Materializer::default()
            .convert(&dir.path().join("a.ts"))
            .unwrap_err();
        let MaterializeError::Extract { source, .. } = err else {
            panic!("expected an extraction error, got {err}");
        };
        assert!(matches!(source, ExtractError::ImportedModule { .. }));
        assert!(source.to_string().contains("import cycle"));
    }

    #[test]
    fn test_contract_examples_match_snapshot() {
        let input = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/contract/examples.ts");
        let conversion = checker().check(&input).unwrap();
        assert_eq!(conversion.keys, 3);
    }

    #[test]
    fn test_type_catalogue_has_no_values() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/contract");
        let source = fs::read_to_string(fixtures.join("requests.ts")).unwrap();
        let input = write(dir.path(), "requests.ts", &source);

        let conversion = Materializer::default().convert(&input).unwrap();
        assert_eq!(conversion.keys, 0);
        assert_eq!(fs::read_to_string(conversion.output).unwrap(), "{}");
    }
}
