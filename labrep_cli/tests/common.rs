use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn labrep_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("labrep"));
	cmd.env("NO_COLOR", "1");
	cmd
}
