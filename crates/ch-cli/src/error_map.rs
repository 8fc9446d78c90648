use std::fmt::Display;

use ch_core::HostError;

fn map_error(code: &'static str, error: impl Display) -> HostError {
    HostError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: HostError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_cli_data_path(error: std::io::Error) -> HostError {
    map_error("CLI_DATA_PATH", error)
}

pub(crate) fn map_cli_events_read(error: std::io::Error) -> HostError {
    map_error("CLI_EVENTS_READ", error)
}

pub(crate) fn map_cli_scan(error: walkdir::Error) -> HostError {
    map_error("CLI_DATA_SCAN", error)
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> HostError {
    map_error("CLI_OUTPUT", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        assert_eq!(emit_error(HostError::new("ERR", "failed")), 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(
            map_cli_data_path(std::io::Error::other("path")).code,
            "CLI_DATA_PATH"
        );
        assert_eq!(
            map_cli_events_read(std::io::Error::other("read")).code,
            "CLI_EVENTS_READ"
        );
        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_output(invalid).code, "CLI_OUTPUT");
    }
}
