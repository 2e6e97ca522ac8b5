#![expect(clippy::unwrap_used, reason = "test code uses unwrap for concise assertions")]

use errtree::{
    Glyphs, PlainError, Rgb, Token, TraceStyle, attach_meta, global_style, set_banner, set_color,
    set_colors_enabled, set_global_style, set_glyphs, trace, wrap,
};

// The process-wide style is shared by every test in this binary, so all
// mutations happen in a single test.
#[test]
fn global_style_drives_trace() {
    assert_eq!(global_style(), TraceStyle::default());

    let err = wrap(Some(PlainError::new("email in use")), "failed to create user").unwrap();
    let err = attach_meta(err, "code", 503);

    set_colors_enabled(false);
    set_banner("errors:");
    set_glyphs(Glyphs {
        middle: "+- ".into(),
        terminal: "\\- ".into(),
        vertical: "|".into(),
    });
    let expected = [
        "errors:",
        "+- failed to create user",
        "|  \\- code: 503",
        "\\- email in use",
    ]
    .join("\n");
    assert_eq!(trace(&err), expected);
    assert_eq!(format!("{err:#}"), expected);

    set_color(Token::Key, Rgb::new(1, 2, 3));
    let style = global_style();
    assert_eq!(style.banner, "errors:");
    let palette = style.palette.as_ref().unwrap();
    assert_eq!(palette.color(Token::Key), Rgb::new(1, 2, 3));
    assert!(trace(&err).contains("code"));

    set_global_style(TraceStyle::default());
    assert_eq!(global_style(), TraceStyle::default());
}
