use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Output helpers
// ═══════════════════════════════════════════════════════════════════════════════

fn print_styled(style: Style, label: &str, message: &str) {
    println!("{}{}{} {}", style.render(), label, style.render_reset(), message);
}

pub fn print_success(message: &str) {
    print_styled(
        Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))),
        "✓",
        message,
    );
}

pub fn print_error(message: &str) {
    print_styled(
        Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))),
        "✗",
        message,
    );
}

pub fn print_key_value(key: &str, value: &str) {
    let key_style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack)));
    println!(
        "  {}{:<12}{} {}",
        key_style.render(),
        key,
        key_style.render_reset(),
        value
    );
}
