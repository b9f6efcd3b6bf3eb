//! ANSI styling for terminal output. Disabled by `NO_COLOR` or `TERM=dumb`.

#[derive(Debug, Clone, Copy)]
pub(crate) struct Palette {
    pub red: &'static str,
    pub yellow: &'static str,
    pub green: &'static str,
    pub cyan: &'static str,
    pub bold: &'static str,
    pub reset: &'static str,
}

const COLOR: Palette = Palette {
    red: "\x1b[31m",
    yellow: "\x1b[33m",
    green: "\x1b[32m",
    cyan: "\x1b[36m",
    bold: "\x1b[1m",
    reset: "\x1b[0m",
};

/// No escape codes at all.
pub(crate) const PLAIN: Palette = Palette {
    red: "",
    yellow: "",
    green: "",
    cyan: "",
    bold: "",
    reset: "",
};

fn color_allowed(no_color: bool, term: Option<&str>) -> bool {
    !no_color && term != Some("dumb")
}

pub(crate) fn palette() -> Palette {
    let term = std::env::var("TERM").ok();
    if color_allowed(std::env::var_os("NO_COLOR").is_some(), term.as_deref()) {
        COLOR
    } else {
        PLAIN
    }
}
