//! smallc-cli: bibliothèque interne du binaire `smallc`
//!
//! `main.rs` ne fait que parser les arguments ; tout le pipeline vit ici pour
//! être testable sans processus :
//! - lecture de la source (fichier ou stdin)
//! - trace des jetons, listing du bytecode (texte ou `--json`)
//! - compilation, diagnostics non fatals sur stderr
//! - exécution encadrée par les bannières de sortie
//!
//! Traces (`feature = "trace"`) et couleurs (`feature = "color"`) optionnelles.

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

#[cfg(feature = "color")]
use owo_colors::{OwoColorize, Stream, Style};

use smallc_compiler::{Compiler, CompilerOptions, Diagnostic, Severity};
use smallc_core::{disassemble, Program};
use smallc_lexer::{Lexer, Token};
use smallc_vm::{Vm, VmOptions};

/// Source par défaut quand aucun fichier n'est donné.
pub const DEFAULT_INPUT: &str = "test_input.c";

/// Bannière d'ouverture de la sortie du programme.
pub const BEGIN_BANNER: &str = ";;;;;;;;;;;;;; BEGINNING OF OUTPUT ;;;;;;;;;;;;;;;;";
/// Bannière de fin.
pub const END_BANNER: &str = ";;;;;;;;;;;;;;;;; END OF OUTPUT ;;;;;;;;;;;;;;;;;;;";

// ───────────────────────────── Types publics ─────────────────────────────

/// Entrée texte : fichier ou `-` (=stdin).
#[derive(Clone, Debug)]
pub enum Input {
    /// Chemin de la source.
    Path(PathBuf),
    /// Entrée standard.
    Stdin,
}

impl Default for Input {
    fn default() -> Self { Self::Path(PathBuf::from(DEFAULT_INPUT)) }
}

impl Input {
    /// `-` ⇒ stdin, sinon chemin ; rien ⇒ `test_input.c`.
    pub fn from_arg(p: Option<PathBuf>) -> Self {
        match p {
            Some(path) if path.as_os_str() == "-" => Self::Stdin,
            Some(path) => Self::Path(path),
            None => Self::default(),
        }
    }
}

/// Une invocation complète : compile, liste, exécute.
///
/// Par défaut la bibliothèque n'écrit que la sortie du programme ; le binaire
/// active les traces (`tokens`, `disasm`) sauf `--no-trace`.
#[derive(Clone, Debug)]
pub struct RunTask {
    /// Source.
    pub input: Input,
    /// Affiche chaque jeton (`Token: ...`).
    pub tokens: bool,
    /// Affiche le listing du bytecode.
    pub disasm: bool,
    /// Listing au format JSON.
    pub json: bool,
    /// Compile seulement.
    pub no_run: bool,
    /// Bannières autour de la sortie du programme.
    pub banner: bool,
    /// Options du compilateur.
    pub compiler: CompilerOptions,
    /// Options de la VM.
    pub vm: VmOptions,
}

impl Default for RunTask {
    fn default() -> Self {
        Self {
            input: Input::default(),
            tokens: false,
            disasm: false,
            json: false,
            no_run: false,
            banner: true,
            compiler: CompilerOptions::default(),
            vm: VmOptions::default(),
        }
    }
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp(None)
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Pipeline complet ; tout ce qui n'est pas diagnostic va dans `out`.
pub fn execute(task: &RunTask, out: &mut dyn Write) -> Result<()> {
    let src = read_source(&task.input).context("lecture de la source")?;
    log::info!("source: {} ({} bytes)", display_input(&task.input), src.len());

    let toks = Lexer::with_options(&src, task.compiler.lexer).tokenize()?;
    if task.tokens {
        write_tokens(&toks, out)?;
    }

    let mut compiler = Compiler::new(task.compiler.clone());
    let result = compiler.compile_tokens(toks);
    for d in compiler.diagnostics() {
        report(d);
    }
    let program = result?;

    if task.json {
        write_json(&program, compiler.diagnostics(), out)?;
    } else if task.disasm {
        writeln!(out)?;
        writeln!(out, "ip: {}, dp: {}", program.code.len(), program.data_size)?;
        out.write_all(disassemble(&program)?.as_bytes())?;
    }

    if task.no_run {
        return Ok(());
    }
    run_program(&program, task, out)
}

fn run_program(program: &Program, task: &RunTask, out: &mut dyn Write) -> Result<()> {
    if task.banner {
        writeln!(out)?;
        writeln!(out, "{BEGIN_BANNER}")?;
    }
    let mut vm = Vm::new(program, &mut *out, task.vm);
    vm.run()?;
    if task.banner {
        writeln!(out, "{END_BANNER}")?;
    }
    out.flush()?;
    Ok(())
}

/// `Token: ...` pour chaque jeton, fins de ligne comprises.
pub fn write_tokens(toks: &[Token], out: &mut dyn Write) -> io::Result<()> {
    for t in toks {
        writeln!(out, "Token: {}", t.value)?;
    }
    Ok(())
}

fn write_json(program: &Program, diags: &[Diagnostic], out: &mut dyn Write) -> Result<()> {
    let instrs = program.instructions().collect::<Result<Vec<_>, _>>()?;
    let doc = serde_json::json!({
        "code_size": program.code.len(),
        "data_size": program.data_size,
        "instructions": instrs,
        "diagnostics": diags,
    });
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}

// ───────────────────────────── Utilitaires ─────────────────────────────

fn read_source(input: &Input) -> Result<String> {
    match input {
        Input::Path(p) => fs::read_to_string(p).with_context(|| format!("impossible de lire {}", p.display())),
        Input::Stdin => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s).context("lecture stdin")?;
            Ok(s)
        }
    }
}

fn display_input(input: &Input) -> String {
    match input {
        Input::Path(p) => display(p),
        Input::Stdin => "<stdin>".to_owned(),
    }
}

fn display(p: &Path) -> String { p.to_string_lossy().into_owned() }

fn report(d: &Diagnostic) { eprintln!("{}", render_diagnostic(d)); }

/// Ligne `error: ...` / `warning: ...` ; la couleur suit le terminal, `NO_COLOR`
/// et `--color`.
fn render_diagnostic(d: &Diagnostic) -> String {
    let tag = match d.severity {
        Severity::Warning => "warning:",
        Severity::Error => "error:",
    };
    let msg = match d.span {
        Some(sp) => format!("{} at {sp}", d.message),
        None => d.message.clone(),
    };
    #[cfg(feature = "color")]
    let tag = {
        let style = match d.severity {
            Severity::Warning => Style::new().yellow().bold(),
            Severity::Error => Style::new().red().bold(),
        };
        tag.if_supports_color(Stream::Stderr, |t| t.style(style)).to_string()
    };
    format!("{tag} {msg}")
}

// ───────────────────────────── Tests ─────────────────────────────
