use log::LevelFilter;
#[cfg(test)]
use serde::de;
#[cfg(test)]
use std::fs;
use std::time::SystemTime;

pub fn setup_logger(level: Option<LevelFilter>) -> Result<(), fern::InitError> {
    let filter = match level {
        None => { LevelFilter::Debug }
        Some(v) => { v }
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(filter)
        .level_for("hyper_util", LevelFilter::Info)
        .level_for("reqwest", LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}


#[cfg(test)]
pub fn parse_test_json<T: for<'a> de::Deserialize<'a>>(path: &str) -> T {
    let json = fs::read_to_string(path).unwrap();
    serde_json::from_str(&json).unwrap()
}
