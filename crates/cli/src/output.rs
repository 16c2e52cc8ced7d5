//! Check result output

use meta_lib::CheckResult;

/// Name the agent shows for this check
pub const CHECK_NAME: &str = "Meta";

/// Print the report line and exit with the status code
pub fn exit_with(result: &CheckResult) -> ! {
    println!("{}", result.report(CHECK_NAME));
    std::process::exit(result.status.exit_code())
}

/// One-line summary of a command line parse error
pub fn usage_error_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.trim_start_matches("error: ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{error::ErrorKind, Command};

    #[test]
    fn test_usage_error_message() {
        let err = Command::new("check-meta").error(
            ErrorKind::MissingRequiredArgument,
            "the following required arguments were not provided",
        );
        assert_eq!(
            usage_error_message(&err),
            "the following required arguments were not provided"
        );
    }
}
