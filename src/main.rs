use std::io::Write;

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use colored::Colorize;
use strum::IntoEnumIterator;

use mythc::{
    CodegenOptions,
    backend::eval::{EvaluationOptions, evaluate},
    lower_program,
    middle::lir::pretty_print::pretty_print_module,
    samples::Sample,
};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Bundled program to compile, see --list
    sample: Option<String>,

    /// List the bundled programs
    #[arg(long)]
    list: bool,

    /// Run the program after printing its module
    #[arg(long)]
    run: bool,

    /// Print the module without colors
    #[arg(long)]
    plain: bool,

    /// Text the program reads from standard input
    #[arg(long, default_value = "")]
    stdin: String,
}

fn report_fatal_error(message: &str) -> ! {
    eprintln!("{} {message}", "Fatal error:".red().bold());
    std::process::exit(1);
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if args.list {
        for sample in Sample::iter() {
            println!("{sample}");
        }
        return;
    }

    let Some(name) = &args.sample else {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "Missing sample name!")
            .exit()
    };

    let Ok(sample) = name.parse::<Sample>() else {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Unknown sample '{name}', see --list"),
            )
            .exit()
    };

    let options = CodegenOptions {
        file_name: format!("{sample}.myth"),
        ..Default::default()
    };

    let module = match lower_program(&sample.program(), &options) {
        Ok(module) => module,
        Err(error) => report_fatal_error(&error.to_string()),
    };

    let dump = pretty_print_module(&module);
    if args.plain {
        println!("{}", strip_ansi_escapes::strip_str(&dump));
    } else {
        println!("{dump}");
    }

    if !args.run {
        return;
    }

    let evaluation = EvaluationOptions {
        stdin: args.stdin.into_bytes(),
        ..Default::default()
    };

    match evaluate(&module, &evaluation) {
        Ok(outcome) => {
            let mut stdout = std::io::stdout();
            if stdout.write_all(&outcome.stdout).and_then(|_| stdout.flush()).is_err() {
                report_fatal_error("Failed to write program output");
            }

            std::process::exit(outcome.exit_code);
        }
        Err(error) => report_fatal_error(&error.to_string()),
    }
}
