//! Bash rendering of a composed build script
//!
//! The composed fragment text is embedded verbatim and in order; the
//! preamble only adds what is needed to run it as a standalone file.

use crate::generator::GeneratedScript;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// Directory the script `cd`s into before building.
    pub source_dir: Option<PathBuf>,
    pub commit_id: Option<String>,
}

pub struct BashScript;

impl BashScript {
    pub fn render(
        generated: &GeneratedScript,
        options: &ScriptOptions,
    ) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        Self::write(&mut out, generated, options)?;
        Ok(out)
    }

    fn write(
        out: &mut String,
        generated: &GeneratedScript,
        options: &ScriptOptions,
    ) -> std::fmt::Result {
        writeln!(out, "#!/bin/bash")?;
        writeln!(out, "set -e")?;
        writeln!(out)?;
        writeln!(out, "# Generated by {} {}", crate::NAME, crate::VERSION)?;
        if let Some(commit) = &options.commit_id {
            writeln!(out, "# Source commit: {}", commit)?;
        }
        for contribution in &generated.contributions {
            writeln!(
                out,
                "# Platform: {} {}",
                contribution.platform, contribution.version
            )?;
        }
        for (tool, version) in &generated.state.required_tools {
            writeln!(out, "# Requires: {}={}", tool, version)?;
        }
        writeln!(out)?;

        if let Some(dir) = &options.source_dir {
            writeln!(
                out,
                "cd {}",
                crate::platforms::shell_quote(&dir.to_string_lossy())
            )?;
            writeln!(out)?;
        }

        out.push_str(&generated.script);
        if !generated.script.ends_with('\n') {
            writeln!(out)?;
        }
        writeln!(out)?;
        writeln!(out, "echo \"Done.\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Contribution;
    use crate::platform::BuildState;

    fn generated() -> GeneratedScript {
        let mut state = BuildState::default();
        state
            .required_tools
            .insert("node".to_string(), "20.11.1".to_string());
        GeneratedScript {
            script: "npm ci\nnpm run build".to_string(),
            language: "nodejs".to_string(),
            contributions: vec![Contribution {
                platform: "nodejs".to_string(),
                version: "20.11.1".to_string(),
            }],
            state,
        }
    }

    #[test]
    fn test_render_embeds_fragments_verbatim() {
        let script = BashScript::render(&generated(), &ScriptOptions::default()).unwrap();
        assert!(script.starts_with("#!/bin/bash\nset -e\n"));
        assert!(script.contains("# Platform: nodejs 20.11.1"));
        assert!(script.contains("# Requires: node=20.11.1"));
        assert!(script.contains("npm ci\nnpm run build\n"));
        assert!(script.trim_end().ends_with("echo \"Done.\""));
        assert!(!script.contains("cd "));
    }

    #[test]
    fn test_render_with_source_dir_and_commit() {
        let options = ScriptOptions {
            source_dir: Some(PathBuf::from("/src/my app")),
            commit_id: Some("abc123".to_string()),
        };
        let script = BashScript::render(&generated(), &options).unwrap();
        assert!(script.contains("# Source commit: abc123"));
        assert!(script.contains("cd '/src/my app'"));
    }
}
