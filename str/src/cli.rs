use crate::{CmdExector, ProjectConfig, RunRequest, RunnerSettings, TestRunner};
use clap::Parser;
use std::{
    env,
    io::{self, IsTerminal},
    path::PathBuf,
};

#[derive(Debug, Parser)]
#[command(name = "str", version, about, long_about = None)]
pub struct Opts {
    /// Test files, relative to the current directory
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Bundle and run every test file in its own process
    #[arg(long)]
    pub isolate: bool,

    /// Program used to execute the bundle
    #[arg(long, env = "STR_RUNTIME")]
    pub runtime: Option<String>,

    /// Directory exported to the test process as NODE_PATH
    #[arg(long)]
    pub node_modules: Option<PathBuf>,

    /// Project config file [default: str.yml if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl CmdExector for Opts {
    async fn execute(self) -> anyhow::Result<i32> {
        let cwd = env::current_dir()?;
        let config = ProjectConfig::discover(self.config.as_deref(), &cwd)?;

        let settings = RunnerSettings {
            runtime: self
                .runtime
                .or(config.runtime)
                .unwrap_or_else(|| "node".to_string()),
            node_modules: self.node_modules.or(config.node_modules),
            temp_root: None,
            color: io::stderr().is_terminal(),
        };
        let runner = TestRunner::new(settings);
        let request = RunRequest::builder().files(self.files).cwd(cwd).build();

        let code = match self.isolate || config.isolate {
            true => runner.run_isolated(&request).await?.exit_code(),
            false => runner.run(&request).await?.exit_code(),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opts_should_parse() {
        let opts = Opts::parse_from([
            "str",
            "--isolate",
            "--runtime",
            "bun",
            "a.test.ts",
            "b.test.ts",
        ]);
        assert!(opts.isolate);
        assert_eq!(opts.runtime.as_deref(), Some("bun"));
        assert_eq!(opts.files, vec![PathBuf::from("a.test.ts"), PathBuf::from("b.test.ts")]);
    }

    #[test]
    fn opts_should_require_files() {
        assert!(Opts::try_parse_from(["str"]).is_err());
    }
}
