use crate::RunnerError;
use askama::Template;
use std::path::PathBuf;

/// Synthetic entry module: registers every test file with the runtime
/// library in the given order, then runs the collected tests.
///
/// Paths are substituted verbatim. A path containing `"` produces an entry
/// that fails to parse, which surfaces as a bundle error.
#[derive(Template)]
#[template(path = "runner.js.j2", escape = "none")]
struct RunnerEntry<'a> {
    files: Vec<&'a str>,
}

pub fn runner_code(files: &[PathBuf]) -> Result<String, RunnerError> {
    let files = files
        .iter()
        .map(|file| {
            file.to_str()
                .ok_or_else(|| RunnerError::InvalidPath(file.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    RunnerEntry { files }.render().map_err(RunnerError::Render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn runner_code_should_register_files_in_order() -> Result<()> {
        let code = runner_code(&["b.test.ts".into(), "dir/a.test.ts".into()])?;
        let lines: Vec<_> = code.lines().collect();

        assert_eq!(lines[0], "import { _strTestRunner } from \"str\";");
        assert_eq!(lines[1], "import { describe } from \"str\";");
        assert_eq!(lines[2], "async function main() {");
        assert_eq!(
            lines[3],
            "  await _strTestRunner.runTestFile(\"b.test.ts\", () => import(\"./b.test.ts\"));"
        );
        assert_eq!(
            lines[4],
            "  await _strTestRunner.runTestFile(\"dir/a.test.ts\", () => \
             import(\"./dir/a.test.ts\"));"
        );
        assert_eq!(lines[5], "  await _strTestRunner.runTests();");
        assert_eq!(lines[6], "}");
        assert_eq!(lines[7], "main();");
        Ok(())
    }

    #[test]
    fn runner_code_should_keep_duplicate_files() -> Result<()> {
        let code = runner_code(&["a.test.ts".into(), "a.test.ts".into()])?;
        let entry = "runTestFile(\"a.test.ts\", () => import(\"./a.test.ts\"))";
        let registered = code.lines().filter(|line| line.contains(entry)).count();
        assert_eq!(registered, 2);
        Ok(())
    }

    #[test]
    fn runner_code_without_files_should_only_run_tests() -> Result<()> {
        let code = runner_code(&[])?;
        assert!(!code.contains("runTestFile"));
        assert!(code.contains("await _strTestRunner.runTests();"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn runner_code_should_reject_non_utf8_paths() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let path = PathBuf::from(OsStr::from_bytes(b"bad\xff.test.ts"));
        let ret = runner_code(&[path]);
        assert!(matches!(ret, Err(RunnerError::InvalidPath(_))));
    }
}
