use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;

/// Write the completion script for `shell` to stdout, named after the
/// command itself so every subcommand (`parse`, `resolve`, ...) is offered.
#[allow(clippy::unnecessary_wraps)]
pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    let mut cmd = C::command();
    let bin = cmd.get_name().to_owned();
    let mut out = std::io::stdout().lock();
    clap_complete::generate(shell, &mut cmd, bin, &mut out);
    Ok(EXIT_SUCCESS)
}
