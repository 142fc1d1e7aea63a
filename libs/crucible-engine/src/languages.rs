//! Language adapters: how source code becomes a runnable artifact and how
//! that artifact is invoked.
//!
//! Each language owns its compile/run commands as data (a tagged variant),
//! not inline string concatenation. The registry is an explicit mapping
//! built once at startup and passed by reference into the orchestrator.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crucible_common::error::ExecError;
use crucible_common::types::Language;
use tokio::fs;
use tracing::debug;

use crate::config::ExecLimits;
use crate::process::{self, ProcessOutput};

/// Command templates for one language's toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// Run the source file directly under an interpreter.
    Interpreted { interpreter: &'static str },
    /// Compile to class files, then run a named class on the VM.
    Jvm {
        compiler: &'static str,
        runtime: &'static str,
        /// Class holding `main` for a bare run. User code must define
        /// `class Solution`; the harness swaps in its own entry class.
        main_class: &'static str,
    },
    /// Compile to a native binary and execute it.
    Native { compiler: &'static str },
}

/// Per-language strategy: file naming plus toolchain commands.
#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub language: Language,
    /// Source file stem. Java requires it to match the public class name.
    pub file_stem: &'static str,
    pub extension: &'static str,
    pub toolchain: Toolchain,
}

/// A prepared, runnable artifact inside one attempt's scratch directory.
/// The scratch directory owns every path in here; dropping it removes them.
#[derive(Debug)]
pub enum Artifact {
    Script {
        interpreter: &'static str,
        source: PathBuf,
    },
    ClassFile {
        runtime: &'static str,
        class_dir: PathBuf,
        main_class: String,
    },
    Binary { path: PathBuf },
}

impl LanguageSpec {
    pub fn source_name(&self) -> String {
        format!("{}.{}", self.file_stem, self.extension)
    }

    /// Write `code` into `dir` and, for compiled toolchains, invoke the
    /// compiler under the compile budget. Non-empty compiler stderr aborts
    /// with [`ExecError::Compile`]; the program is never run.
    pub async fn prepare(
        &self,
        dir: &Path,
        code: &str,
        limits: &ExecLimits,
    ) -> Result<Artifact, ExecError> {
        self.prepare_with_main(dir, code, limits, None).await
    }

    /// `prepare`, but overriding the class the VM will run. Only meaningful
    /// for the JVM toolchain; the harness uses it for its wrapper entry.
    pub(crate) async fn prepare_with_main(
        &self,
        dir: &Path,
        code: &str,
        limits: &ExecLimits,
        main_class: Option<&str>,
    ) -> Result<Artifact, ExecError> {
        let source = dir.join(self.source_name());
        fs::write(&source, code).await?;
        debug!(language = %self.language, path = %source.display(), "materialized source");

        let compile_timeout = Duration::from_millis(limits.compile_timeout_ms);
        match self.toolchain {
            Toolchain::Interpreted { interpreter } => Ok(Artifact::Script {
                interpreter,
                source,
            }),
            Toolchain::Jvm {
                compiler,
                runtime,
                main_class: default_main,
            } => {
                let args = [source.as_os_str()];
                compile(compiler, &args, compile_timeout, limits).await?;
                Ok(Artifact::ClassFile {
                    runtime,
                    class_dir: dir.to_path_buf(),
                    main_class: main_class.unwrap_or(default_main).to_string(),
                })
            }
            Toolchain::Native { compiler } => {
                let binary = dir.join(self.file_stem);
                let args = [
                    source.as_os_str(),
                    OsStr::new("-o"),
                    binary.as_os_str(),
                ];
                compile(compiler, &args, compile_timeout, limits).await?;
                Ok(Artifact::Binary { path: binary })
            }
        }
    }

    /// Run a prepared artifact under `timeout_ms`.
    pub async fn invoke(
        &self,
        artifact: &Artifact,
        stdin: Option<&str>,
        timeout_ms: u64,
        limits: &ExecLimits,
    ) -> Result<ProcessOutput, ExecError> {
        let timeout = Duration::from_millis(timeout_ms);
        match artifact {
            Artifact::Script {
                interpreter,
                source,
            } => {
                process::run(
                    interpreter,
                    &[source.as_os_str()],
                    stdin,
                    timeout,
                    limits.max_output_bytes,
                )
                .await
            }
            Artifact::ClassFile {
                runtime,
                class_dir,
                main_class,
            } => {
                let args = [
                    OsStr::new("-cp"),
                    class_dir.as_os_str(),
                    OsStr::new(main_class.as_str()),
                ];
                process::run(runtime, &args, stdin, timeout, limits.max_output_bytes).await
            }
            Artifact::Binary { path } => {
                process::run(
                    path.as_os_str(),
                    &[] as &[&OsStr],
                    stdin,
                    timeout,
                    limits.max_output_bytes,
                )
                .await
            }
        }
    }
}

/// Run a compiler, mapping failures into [`ExecError::Compile`]. A compiler
/// deadline counts as a compile failure, not an execution timeout.
async fn compile<S: AsRef<OsStr>>(
    compiler: &str,
    args: &[S],
    timeout: Duration,
    limits: &ExecLimits,
) -> Result<(), ExecError> {
    let output = match process::run(compiler, args, None, timeout, limits.max_output_bytes).await {
        Ok(output) => output,
        Err(ExecError::Timeout { timeout_ms }) => {
            return Err(ExecError::Compile(format!(
                "compiler timed out after {timeout_ms}ms"
            )))
        }
        Err(other) => return Err(other),
    };
    if !output.stderr.trim().is_empty() {
        return Err(ExecError::Compile(output.stderr));
    }
    Ok(())
}

/// Injected mapping from language to adapter, constructed once at process
/// start. Lookup of an unregistered language fails before any filesystem
/// or process activity.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    specs: HashMap<Language, LanguageSpec>,
}

impl LanguageRegistry {
    /// Empty registry; useful for tests and constrained deployments.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four builtin toolchains.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(LanguageSpec {
            language: Language::Javascript,
            file_stem: "solution",
            extension: "js",
            toolchain: Toolchain::Interpreted { interpreter: "node" },
        });
        registry.insert(LanguageSpec {
            language: Language::Python,
            file_stem: "solution",
            extension: "py",
            toolchain: Toolchain::Interpreted {
                interpreter: "python3",
            },
        });
        registry.insert(LanguageSpec {
            language: Language::Java,
            file_stem: "Solution",
            extension: "java",
            toolchain: Toolchain::Jvm {
                compiler: "javac",
                runtime: "java",
                main_class: "Solution",
            },
        });
        registry.insert(LanguageSpec {
            language: Language::Cpp,
            file_stem: "solution",
            extension: "cpp",
            toolchain: Toolchain::Native { compiler: "g++" },
        });
        registry
    }

    pub fn insert(&mut self, spec: LanguageSpec) {
        self.specs.insert(spec.language, spec);
    }

    pub fn get(&self, language: Language) -> Result<&LanguageSpec, ExecError> {
        self.specs
            .get(&language)
            .ok_or_else(|| ExecError::UnsupportedLanguage(language.to_string()))
    }

    /// Registered languages in declaration order of the `Language` enum.
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| self.specs.contains_key(l))
            .collect()
    }
}
