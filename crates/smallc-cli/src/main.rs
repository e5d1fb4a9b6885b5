//! `smallc`: compile puis exécute un programme smallc
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation (logger,
//! couleur), et délégation à `smallc_cli` (lib).

#![forbid(unsafe_code)]

use std::{io, path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};

use smallc_cli as cli;
use smallc_compiler::CompilerOptions;
use smallc_vm::{VmOptions, DEFAULT_CAPACITY};

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "smallc", version, about = "smallc: compilateur une passe + VM à pile pour un sous-ensemble de C", long_about = None)]
struct Opt {
    /// Fichier source (- pour stdin ; test_input.c si omis)
    input: Option<PathBuf>,

    /// Supprime la trace des jetons et le listing du bytecode (affichés par défaut)
    #[arg(long = "no-trace")]
    no_trace: bool,

    /// Supprime la seule trace des jetons
    #[arg(long = "no-tokens")]
    no_tokens: bool,

    /// Supprime le seul listing du bytecode
    #[arg(long = "no-disasm")]
    no_disasm: bool,

    /// Listing au format JSON (même avec --no-disasm)
    #[arg(long)]
    json: bool,

    /// Compile sans exécuter
    #[arg(long = "no-run")]
    no_run: bool,

    /// Supprime les bannières autour de la sortie
    #[arg(long = "no-banner")]
    no_banner: bool,

    /// Capacité de la pile d'opérandes
    #[arg(long = "stack", value_name = "N", default_value_t = DEFAULT_CAPACITY)]
    stack: usize,

    /// Arrête la VM après N instructions
    #[arg(long = "max-steps", value_name = "N")]
    max_steps: Option<u64>,

    /// Profondeur maximale des portées
    #[arg(long = "max-scopes", value_name = "N", default_value_t = 100)]
    max_scopes: usize,

    /// Les alertes deviennent des erreurs
    #[arg(long = "deny-warnings")]
    deny_warnings: bool,

    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

impl Opt {
    fn into_task(self) -> cli::RunTask {
        cli::RunTask {
            input: cli::Input::from_arg(self.input),
            tokens: !self.no_trace && !self.no_tokens,
            disasm: (!self.no_trace && !self.no_disasm) || self.json,
            json: self.json,
            no_run: self.no_run,
            banner: !self.no_banner,
            compiler: CompilerOptions {
                max_scope_depth: self.max_scopes,
                deny_warnings: self.deny_warnings,
                ..CompilerOptions::default()
            },
            vm: VmOptions { stack_capacity: self.stack, max_steps: self.max_steps },
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

// ──────────────────────────── Logger / Couleur ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", level);
    }
    cli::init_logger();
}

#[cfg(feature = "color")]
fn init_color(choice: ColorChoice) {
    // `Auto` laisse `supports-color` décider (tty, NO_COLOR, CLICOLOR_FORCE).
    match choice {
        ColorChoice::Auto => owo_colors::unset_override(),
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
    }
}

#[cfg(not(feature = "color"))]
fn init_color(_: ColorChoice) {}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> Result<()> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    let task = opt.into_task();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::execute(&task, &mut out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(args: &[&str]) -> cli::RunTask {
        let argv = std::iter::once("smallc").chain(args.iter().copied());
        Opt::try_parse_from(argv).unwrap().into_task()
    }

    #[test]
    fn traces_are_on_by_default() {
        let t = task(&["prog.c"]);
        assert!(t.tokens && t.disasm && !t.json);
        assert!(t.banner && !t.no_run);
        assert!(matches!(t.input, cli::Input::Path(p) if p == PathBuf::from("prog.c")));
    }

    #[test]
    fn trace_switches() {
        let t = task(&["--no-trace"]);
        assert!(!t.tokens && !t.disasm);
        let t = task(&["--no-tokens"]);
        assert!(!t.tokens && t.disasm);
        let t = task(&["--no-disasm"]);
        assert!(t.tokens && !t.disasm);
        let t = task(&["--no-trace", "--json"]);
        assert!(!t.tokens && t.disasm && t.json);
    }

    #[test]
    fn limits_reach_the_task() {
        let t = task(&["--stack", "64", "--max-steps", "1000", "--max-scopes", "8", "--deny-warnings"]);
        assert_eq!(t.vm.stack_capacity, 64);
        assert_eq!(t.vm.max_steps, Some(1000));
        assert_eq!(t.compiler.max_scope_depth, 8);
        assert!(t.compiler.deny_warnings);
    }
}
