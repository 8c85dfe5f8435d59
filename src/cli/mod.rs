//! WF-010: CLI subcommands - init, validate, render, build.
//!
//! Commands are synchronous; each one that composes documents drives a
//! current-thread tokio runtime for the loader calls.

use crate::core::channel::Output;
use crate::core::composer::{Composer, ComposerOptions};
use crate::core::parser::{self, CONFIG_FILE};
use crate::core::paths;
use crate::core::types::{ResolveError, WeftConfig};
use crate::loader::FsLoader;
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new weft project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate weft.yaml
    Validate {
        /// Path to weft.yaml
        #[arg(short, long, default_value = CONFIG_FILE)]
        file: PathBuf,
    },

    /// Compose one template and print the result
    Render {
        /// Template to compose
        input: PathBuf,

        /// Path to weft.yaml (optional; defaults apply when missing)
        #[arg(short, long, default_value = CONFIG_FILE)]
        file: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every output event as a JSON line
        #[arg(long)]
        events: bool,
    },

    /// Compose every watched file under base into the output directory
    Build {
        /// Path to weft.yaml (optional; defaults apply when missing)
        #[arg(short, long, default_value = CONFIG_FILE)]
        file: PathBuf,

        /// Output directory (overrides `output` in weft.yaml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Render {
            input,
            file,
            output,
            events,
        } => cmd_render(&file, &input, output.as_deref(), events),
        Commands::Build { file, output } => cmd_build(&file, output.as_deref()),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let base = path.join("src");
    std::fs::create_dir_all(&base).map_err(|e| format!("cannot create src dir: {}", e))?;

    let config = r#"base: src
layout: layout.html
output: dist

data:
  title: My Site

tags:
  data: ["{{", "}}"]
  directive: ["<!--", "-->"]

watch: [".html"]
"#;
    let layout = r#"<!doctype html>
<html>
<head><title>{{title}}</title></head>
<body>
<!-- slot -->
</body>
</html>
"#;
    let index = "<h1>{{title}}</h1>\n<p>Rendered from {{dirname}}{{filename}}{{extname}}</p>\n";

    let files = [
        (config_path.clone(), config),
        (base.join("layout.html"), layout),
        (base.join("index.html"), index),
    ];
    for (file, content) in &files {
        std::fs::write(file, content)
            .map_err(|e| format!("cannot write {}: {}", file.display(), e))?;
    }

    println!("Initialized weft project at {}", path.display());
    for (file, _) in &files {
        println!("  Created: {}", file.display());
    }
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config, &config_dir(file)?);

    if errors.is_empty() {
        println!(
            "OK: {} ({} data keys, watching {})",
            file.display(),
            config.data.len(),
            config.watched_extensions().join(", ")
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// A loaded project: its config, the config file's absolute path, and the
/// directory it lives in.
struct Project {
    config: WeftConfig,
    file: PathBuf,
    dir: PathBuf,
}

impl Project {
    fn composer(&self) -> Result<Composer, String> {
        let options = ComposerOptions::from_config(&self.config, &self.dir);
        Composer::new(options, Arc::new(FsLoader)).map_err(|e| e.to_string())
    }
}

/// Absolute directory containing `file`.
fn config_dir(file: &Path) -> Result<PathBuf, String> {
    let dir = absolute(file)?
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(dir)
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    let cwd = std::env::current_dir().map_err(|e| format!("cannot read current dir: {}", e))?;
    Ok(paths::normalize(&cwd.join(path)))
}

/// Load and validate the project config. A missing config file yields
/// defaults; a missing default layout is dropped with a warning.
fn load_project(file: &Path) -> Result<Project, String> {
    let file = absolute(file)?;
    let dir = config_dir(&file)?;
    let mut config = parser::load_config(&file)?;

    if let Some(layout) = config.layout.as_deref() {
        let target = paths::resolve_layout(layout, &config.base_dir(&dir));
        if !target.is_file() {
            tracing::warn!(layout = %target.display(), "default layout file does not exist");
            config.layout = None;
        }
    }

    let errors = parser::validate_config(&config, &dir);
    if errors.is_empty() {
        return Ok(Project { config, file, dir });
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| format!("cannot start runtime: {}", e))
}

/// `path` relative to `base` when it lies inside it, else as given.
fn display_path(path: &Path, base: &Path) -> String {
    if paths::is_out_bound(path, base) {
        return paths::to_slash(path);
    }
    path.strip_prefix(base)
        .map(paths::to_slash)
        .unwrap_or_else(|_| paths::to_slash(path))
}

/// Log a recoverable resolution error.
fn report(error: &ResolveError, base: &Path) {
    let src = display_path(error.src(), base);
    let target = display_path(error.target(), base);
    let directive = error.directive().unwrap_or("default layout");
    match error {
        ResolveError::Circle { .. } => {
            tracing::warn!(kind = %error.kind(), %src, %target, directive, "cyclic directive left unresolved")
        }
        ResolveError::Io { message, .. } => {
            tracing::error!(kind = %error.kind(), %src, %target, directive, %message, "cannot read target")
        }
    }
}

fn write_output(path: &Path, text: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    std::fs::write(path, text).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

fn cmd_render(
    file: &Path,
    input: &Path,
    output: Option<&Path>,
    events: bool,
) -> Result<(), String> {
    let project = load_project(file)?;
    let composer = project.composer()?;
    let input = absolute(input)?;

    let text = runtime()?.block_on(async {
        let document = composer.open(&input).await.map_err(|e| e.to_string())?;
        let mut rx = document.stream();
        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            if events {
                let line = serde_json::to_string(&event)
                    .map_err(|e| format!("cannot encode event: {}", e))?;
                println!("{}", line);
            }
            match event {
                Output::Data { text: chunk, .. } => text.push_str(&chunk),
                Output::Error { error } => report(&error, composer.root()),
                Output::End => break,
            }
        }
        Ok::<_, String>(text)
    })?;

    match output {
        Some(path) => write_output(path, &text),
        None if !events => {
            print!("{}", text);
            Ok(())
        }
        None => Ok(()),
    }
}

/// Counts printed after a build.
#[derive(Debug, Default, PartialEq, Eq)]
struct BuildSummary {
    composed: usize,
    copied: usize,
    errors: usize,
}

fn cmd_build(file: &Path, output: Option<&Path>) -> Result<(), String> {
    let project = load_project(file)?;
    let out_dir = match output {
        Some(dir) => absolute(dir)?,
        None => project.config.output_dir(&project.dir),
    };
    let summary = build(&project, &out_dir)?;
    println!(
        "Built {} -> {}: {} composed, {} copied, {} error(s)",
        project.config.base_dir(&project.dir).display(),
        out_dir.display(),
        summary.composed,
        summary.copied,
        summary.errors
    );
    Ok(())
}

fn build(project: &Project, out_dir: &Path) -> Result<BuildSummary, String> {
    let composer = project.composer()?;
    let base = composer.root().to_path_buf();
    let layout = project
        .config
        .layout
        .as_deref()
        .map(|l| paths::resolve_layout(l, &base));

    let pattern = format!("{}/**/*", glob::Pattern::escape(&base.to_string_lossy()));
    let entries = glob::glob(&pattern).map_err(|e| format!("invalid base path: {}", e))?;

    let rt = runtime()?;
    let mut summary = BuildSummary::default();
    for entry in entries {
        let path = entry.map_err(|e| format!("cannot walk {}: {}", base.display(), e))?;
        if !path.is_file()
            || path.starts_with(out_dir)
            || path == project.file
            || Some(&path) == layout.as_ref()
        {
            continue;
        }
        let Ok(relative) = path.strip_prefix(&base) else {
            continue;
        };
        let dest = out_dir.join(relative);

        if !project.config.is_watched(&path) {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
            }
            std::fs::copy(&path, &dest)
                .map_err(|e| format!("cannot copy {}: {}", path.display(), e))?;
            summary.copied += 1;
            continue;
        }

        tracing::info!(page = %paths::to_slash(relative), "composing");
        let rendered = rt.block_on(async {
            let document = composer.open(&path).await.map_err(|e| e.to_string())?;
            Ok::<_, String>(document.render().await)
        })?;
        for error in &rendered.errors {
            report(error, &base);
        }
        summary.errors += rendered.errors.len();
        write_output(&dest, &rendered.text)?;
        summary.composed += 1;
    }
    Ok(summary)
}
