use anyhow::{anyhow, Result};
use bpaf::Bpaf;
use eval_overlay::eval::{evaluate_and_annotate, last_form_span, SexpEvaluator};
use eval_overlay::output::render_inline;
use eval_overlay::overlay::{
    AnnotationManager, DocumentId, MemorySurface, OverlayConfig, RemovalPolicy, ResultSink,
    Viewport, DEFAULT_FALLBACK_WIDTH, DEFAULT_RESULT_PREFIX,
};
use eval_overlay::util::position_to_offset;
use lsp_types::Position;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version, fallback_to_usage)]
/// Inline evaluation results: shows `(+ 1 2) => 3` right after the form
enum Cmd {
    /// Evaluate the form before a position and print the file with the result inline
    #[bpaf(command)]
    Eval {
        /// 1-based line of the position (default: end of file)
        #[bpaf(long, argument("LINE"))]
        line: Option<u32>,

        /// 1-based column of the position in UTF-16 units (default: end of line)
        #[bpaf(long, argument("COLUMN"))]
        column: Option<u32>,

        /// Text shown before the value
        #[bpaf(long, argument("PREFIX"), fallback(DEFAULT_RESULT_PREFIX.to_string()))]
        prefix: String,

        /// When the annotation goes away [never, command (default), or seconds]
        #[bpaf(long, argument("POLICY"), fallback(RemovalPolicy::default()))]
        policy: RemovalPolicy,

        /// Viewport width in columns
        #[bpaf(short, long, argument("COLUMNS"), fallback(DEFAULT_FALLBACK_WIDTH))]
        width: usize,

        /// Long lines wrap instead of scrolling off screen
        #[bpaf(long)]
        soft_wrap: bool,

        /// Source file
        #[bpaf(positional("FILE"))]
        file: PathBuf,
    },

    /// Start LSP server
    #[bpaf(command)]
    Lsp,
}

/// Mirrors every result on stderr, the terminal's echo area.
struct StderrSink<'a> {
    prefix: &'a str,
}

impl ResultSink for StderrSink<'_> {
    fn publish(&mut self, value: &str) {
        eprintln!("{}{}", self.prefix, value);
    }
}

fn main() -> Result<()> {
    use bpaf::Args;

    let cmd = match cmd().run_inner(Args::current_args()) {
        Ok(cmd) => cmd,
        Err(bpaf::ParseFailure::Stdout(msg, _)) => {
            print!("{}", msg);
            std::process::exit(0);
        }
        Err(bpaf::ParseFailure::Completion(c)) => {
            print!("{}", c);
            std::process::exit(0);
        }
        Err(bpaf::ParseFailure::Stderr(msg)) => {
            eprintln!("{}", msg);
            // Show help on any parse error
            if let Err(bpaf::ParseFailure::Stdout(help, _)) =
                cmd().run_inner(Args::from(&["--help"]))
            {
                print!("{}", help);
            }
            std::process::exit(1);
        }
    };

    match cmd {
        Cmd::Eval { line, column, prefix, policy, width, soft_wrap, file } => {
            init_tracing("warn");

            let source = fs::read_to_string(&file)?;
            let doc = DocumentId::new(file.display().to_string());

            let mut surface = MemorySurface::new();
            surface.open(doc.clone(), source.as_str());
            let last_line = source.lines().count().max(1) as u32 - 1;
            surface.set_viewport(
                &doc,
                Some(Viewport::new(0, last_line, width).with_soft_wrap(soft_wrap)),
            );

            let offset = match line {
                Some(line) => position_to_offset(
                    &source,
                    Position {
                        line: line.saturating_sub(1),
                        character: column.map_or(u32::MAX, |c| c.saturating_sub(1)),
                    },
                ),
                None => source.len(),
            };
            surface.set_cursor(&doc, offset);
            let span = last_form_span(&source, offset)
                .ok_or_else(|| anyhow!("no form before offset {} in {}", offset, file.display()))?;

            let config = OverlayConfig::new()
                .with_result_prefix(prefix.as_str())
                .with_removal_policy(policy)
                .with_fallback_width(width);
            let mut manager = AnnotationManager::new(config);
            let options = manager.default_options();
            let mut evaluator = SexpEvaluator::new();

            // The whole invocation is one command.
            surface.begin_command();
            let evaluation = evaluate_and_annotate(
                &mut manager,
                &surface,
                &mut evaluator,
                &mut StderrSink { prefix: &prefix },
                &doc,
                span,
                &options,
            )?;
            surface.end_command();

            if evaluation.is_none() {
                tracing::warn!("Nothing evaluated in {}", file.display());
            }
            print!("{}", render_inline(&source, manager.annotations(&doc)));
        }

        Cmd::Lsp => {
            init_tracing("info");
            tracing::info!("Starting eval-overlay LSP server");
            eval_overlay::lsp::run_server()?;
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
