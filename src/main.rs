use clreq_tools::cli::{self, Cli};
use clreq_tools::ui::output;

fn init_logging(debug: bool) {
    let mut builder = if debug {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Debug);
        builder
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
    };
    builder.format_timestamp(None).init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    if let Err(err) = cli::run(cli) {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
