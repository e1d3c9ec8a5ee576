mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use log::{info, warn};

use hamill::ParseError;
use hamill::line::tag_lines;
use renderer::{FsReader, PlainHighlighter, RenderError, RenderOptions, Rendered, Renderer};

use crate::config::BatchConfig;

const SUBCOMMANDS: &[&str] = &["render", "process", "test", "help"];

#[derive(Parser)]
#[command(name = "hamill", version, about = "Hamill markup to HTML compiler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log more (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile one .hml file to HTML
    Render(RenderArgs),

    /// Compile every target listed in a TOML batch file
    Process(ProcessArgs),

    /// Run .test.hml fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Hamill source file
    file: String,

    /// Emit a complete HTML page instead of a fragment
    #[arg(long)]
    full: bool,

    /// Drop nodes that fail to render instead of aborting
    #[arg(long)]
    skip_errors: bool,

    /// Write the HTML here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Parse only, don't render (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the tagged lines
    #[arg(long)]
    lines: bool,

    /// Dump the parsed document
    #[arg(long)]
    ast: bool,

    /// Render code blocks without syntax highlighting
    #[arg(long)]
    no_highlight: bool,
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// TOML batch configuration
    config: PathBuf,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.hml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Why a document could not be compiled.
enum Failure {
    Parse(ParseError),
    Render(RenderError),
}

fn main() {
    // `hamill page.hml` is short for `hamill render page.hml`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|p| p + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    match cli.command {
        Command::Render(render_args) => do_render(render_args, cli.no_color),
        Command::Process(process_args) => do_process(process_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn do_render(args: RenderArgs, no_color: bool) {
    let path = Path::new(&args.file);
    let source = read_source(path);

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    // --lines: dump the line tagger's view
    if args.lines {
        match tag_lines(&source, file_id) {
            Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
            Err(error) => {
                report(&Failure::Parse(error), &files, no_color);
                process::exit(1);
            }
        }
        return;
    }

    let parser = hamill::Parser::new(source, file_id).with_name(args.file.clone());
    let mut doc = match parser.parse() {
        Ok(doc) => doc,
        Err(error) => {
            report(&Failure::Parse(error), &files, no_color);
            process::exit(1);
        }
    };

    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    if args.ast {
        println!("{:#?}", doc.nodes);
        return;
    }

    let options = RenderOptions {
        full_document: args.full,
        skip_errors: args.skip_errors,
    };
    let mut renderer = Renderer::new(options).with_reader(FsReader::beside(path));
    if args.no_highlight {
        renderer = renderer.with_highlighter(PlainHighlighter);
    }

    let rendered = match renderer.render(&mut doc) {
        Ok(rendered) => rendered,
        Err(error) => {
            report(&Failure::Render(error), &files, no_color);
            process::exit(1);
        }
    };
    warn_skipped(&args.file, &rendered);

    match &args.output {
        Some(output) => {
            if let Err(e) = std::fs::write(output, &rendered.html) {
                eprintln!("error: cannot write '{}': {}", output.display(), e);
                process::exit(1);
            }
            info!("wrote {}", output.display());
        }
        None => print!("{}", rendered.html),
    }
}

fn do_process(args: ProcessArgs, no_color: bool) {
    let config = match BatchConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let base_dir = args
        .config
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let jobs = match config.jobs(&base_dir) {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let options = RenderOptions {
        full_document: config.full_document,
        skip_errors: config.skip_errors,
    };

    let mut files = SimpleFiles::new();
    for job in &jobs {
        let name = job.source.display().to_string();
        let source = read_source(&job.source);
        let file_id = files.add(name.clone(), source.clone());

        let result = hamill::Parser::new(source, file_id)
            .with_name(name.clone())
            .parse()
            .map_err(Failure::Parse)
            .and_then(|mut doc| {
                Renderer::new(options.clone())
                    .with_reader(FsReader::beside(&job.source))
                    .render(&mut doc)
                    .map_err(Failure::Render)
            });
        let rendered = match result {
            Ok(rendered) => rendered,
            Err(failure) => {
                report(&failure, &files, no_color);
                process::exit(1);
            }
        };
        warn_skipped(&name, &rendered);

        let written = job
            .output
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(&job.output, &rendered.html));
        if let Err(e) = written {
            eprintln!("error: cannot write '{}': {}", job.output.display(), e);
            process::exit(1);
        }
        eprintln!("{} -> {}", name, job.output.display());
    }
    info!("processed {} target(s)", jobs.len());
}

fn warn_skipped(name: &str, rendered: &Rendered) {
    for (kind, count) in &rendered.report.skipped {
        warn!("{}: skipped {} {} node(s)", name, count, kind);
    }
}

fn report(failure: &Failure, files: &SimpleFiles<String, String>, no_color: bool) {
    match failure {
        Failure::Parse(error) => {
            let writer = StandardStream::stderr(color_choice(no_color));
            let config = term::Config::default();
            let diagnostic = error.to_diagnostic();
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
        }
        Failure::Render(error) => eprintln!("error: {}", error),
    }
}
