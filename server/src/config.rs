use super::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

mod log_level_serde {
    use super::*;

    pub fn serialize<S>(level: &Option<Level>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match level {
            Some(level) => serializer.serialize_some(level.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| Level::from_str(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    // Logging level
    #[serde(default, with = "log_level_serde")]
    pub log_level: Option<Level>,

    // Replication queue to poll
    #[serde(default)]
    pub queue: crate::queue::Config,

    // Only records from this bucket are mirrored
    #[serde(default = "default_bucket")]
    pub bucket: String,

    // Vector clock rendering on decoded records
    #[serde(default)]
    pub vclock_format: replsink_record::Format,

    // Sink table
    #[serde(default)]
    pub table: replsink_dynamodb::Config,
}

fn default_bucket() -> String {
    "test".to_string()
}

fn options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.optflag("h", "help", "print this help menu")
        .optflag("v", "version", "print the version information")
        .optopt("c", "config", "use a custom configuration file", "FILE");
    opts
}

pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "Replsink", env!("CARGO_PKG_NAME")).map_or_else(
        || {
            #[cfg(target_os = "linux")]
            return std::path::Path::new("/etc/opt").join(env!("CARGO_PKG_NAME"));

            #[cfg(all(unix, not(target_os = "linux")))]
            return std::path::Path::new("/etc").join(env!("CARGO_PKG_NAME"));

            #[cfg(windows)]
            return std::env::current_exe()
                .trace_expect("Failed to get current executable path")
                .join(env!("CARGO_PKG_NAME"));

            #[cfg(not(any(unix, windows)))]
            compile_error!("No idea how to determine default config directory for target platform");
        },
        |proj_dirs| proj_dirs.config_local_dir().to_path_buf(),
    )
}

pub fn init() -> Option<(Config, String)> {
    // Parse cmdline
    let opts = options();
    let args: Vec<String> = std::env::args().collect();
    let flags = opts
        .parse(&args[1..])
        .expect("Failed to parse command line args");
    if flags.opt_present("h") {
        let brief = format!(
            "{} {} - {}\n\nUsage: {} [options]",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION"),
            args[0]
        );
        print!("{}", opts.usage(&brief));
        return None;
    }
    if flags.opt_present("v") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return None;
    }

    let mut b = ::config::Config::builder();

    // Add config file
    let config_source: String;
    if let Some(source) = flags.opt_str("config") {
        config_source = format!("Using configuration file '{source}' specified on command line");
        b = b.add_source(::config::File::with_name(&source))
    } else if let Ok(source) = std::env::var("REPLSINK_CONFIG_FILE") {
        config_source = format!(
            "Using configuration file '{source}' specified by REPLSINK_CONFIG_FILE environment variable"
        );
        b = b.add_source(::config::File::with_name(&source))
    } else {
        let path = config_dir().join(format!("{}.yaml", env!("CARGO_PKG_NAME")));
        config_source = format!("Using configuration file '{}'", path.display());
        b = b.add_source(::config::File::from(path).required(false))
    }

    // Pull in environment vars
    b = b.add_source(::config::Environment::with_prefix("REPLSINK"));

    let config: Config = b
        .build()
        .expect("Failed to read configuration")
        .try_deserialize()
        .expect("Failed to parse configuration");

    Some((config, config_source))
}
