use crate::error::ConfigurationError;
use crate::transport::REBOOT_EXIT_STATUS;

/// Heredoc delimiter used to embed the user's script. A script containing it
/// would terminate the heredoc early, so such scripts are refused.
pub const SCRIPT_DELIMITER: &str = "EOF_ONEACH_SCRIPT";

pub fn check_script(script: &str) -> Result<(), ConfigurationError> {
    if script.contains(SCRIPT_DELIMITER) {
        return Err(ConfigurationError::UnsupportedCommand {
            delimiter: SCRIPT_DELIMITER,
        });
    }
    Ok(())
}

/// Builds a host-level script that runs `script` inside `zonename` through a
/// login shell and propagates its exit status, except that the transport's
/// reboot status is reported as 1.
pub fn wrap(zonename: &str, script: &str) -> Result<String, ConfigurationError> {
    check_script(script)?;
    if zonename.is_empty()
        || !zonename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ConfigurationError::Invalid(format!(
            "invalid zone name: \"{}\"",
            zonename
        )));
    }

    Ok(render(&format!("zlogin -Q {} bash -l", zonename), script))
}

fn render(entry: &str, script: &str) -> String {
    let mut out = String::with_capacity(script.len() + 160);
    out.push_str(&format!("cat <<'{}' | {}\n", SCRIPT_DELIMITER, entry));
    out.push_str(script);
    if !script.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(SCRIPT_DELIMITER);
    out.push('\n');
    out.push_str("rv=$?\n");
    out.push_str(&format!(
        "if [ $rv -eq {} ]; then\n    exit 1\nfi\n",
        REBOOT_EXIT_STATUS
    ));
    out.push_str("exit $rv\n");
    out
}
