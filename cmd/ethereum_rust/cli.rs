use clap::{Arg, ArgAction, Command};
use tracing::Level;

pub fn cli() -> Command {
    Command::new("ethereum_rust")
        .about("Ethereum Rust state-trie synchronizer")
        .author("Lambdaclass")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .default_value(Level::INFO.as_str())
                .value_name("LOG_LEVEL")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("state-root")
                .long("state-root")
                .value_name("HASH")
                .help("Target state-trie root to synchronize against (32-byte hex)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("datadir")
                .long("datadir")
                .value_name("DATABASE_DIRECTORY")
                .help("Where the state and code stores are persisted (libmdbx)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_name("COUNT")
                .help("Overrides the default request batch size")
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
}
