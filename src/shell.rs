//! Shell wrappers that apply wtr's directory changes
//!
//! Each call gets a fresh `mktemp` file exported as `WTR_CD_FILE`. When wtr
//! exits 0 the wrapper `cd`s into the path written there; the file is always
//! removed.

use clap::ValueEnum;
use wtr::cd_request::CD_FILE_ENV_VAR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitShell {
    Bash,
    Zsh,
    Fish,
}

pub fn init_script(shell: InitShell) -> String {
    match shell {
        InitShell::Bash | InitShell::Zsh => POSIX_TEMPLATE,
        InitShell::Fish => FISH_TEMPLATE,
    }
    .replace("{VAR}", CD_FILE_ENV_VAR)
}

const POSIX_TEMPLATE: &str = r#"wtr() {
    local cd_file wtr_status
    cd_file="$(mktemp "${TMPDIR:-/tmp}/wtr_cd.XXXXXX")" || return 2
    {VAR}="$cd_file" command wtr "$@"
    wtr_status=$?
    if [ "$wtr_status" -eq 0 ] && [ -s "$cd_file" ]; then
        cd -- "$(cat "$cd_file")" || wtr_status=2
    fi
    rm -f "$cd_file"
    return "$wtr_status"
}
"#;

const FISH_TEMPLATE: &str = r#"function wtr
    set -l tmp_dir /tmp
    set -q TMPDIR; and set tmp_dir $TMPDIR
    set -l cd_file (mktemp $tmp_dir/wtr_cd.XXXXXX); or return 2
    env {VAR}=$cd_file wtr $argv
    set -l wtr_status $status
    if test $wtr_status -eq 0; and test -s $cd_file
        cd (cat $cd_file); or set wtr_status 2
    end
    rm -f $cd_file
    return $wtr_status
end
"#;
