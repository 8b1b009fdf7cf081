use fieldclaim::{Assignment, ClaimError, FieldSource, Record};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_assignment(record: &Record, claims: &[Vec<String>], assignment: &Assignment, color: bool) {
    let palette = ansi::Palette::new(color);
    print_header(record, &palette);

    println!("\n{}", palette.paint("━━━ Slots ━━━", ansi::GRAY));
    for (idx, fields) in assignment.slots.iter().enumerate() {
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        println!(
            "  {} {} {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.paint(claim_label(claims.get(idx)), ansi::CYAN),
            palette.dim("→"),
            if names.is_empty() {
                palette.dim("(nothing)")
            } else {
                palette.bold(palette.paint(names.join(", "), ansi::GREEN))
            }
        );
    }

    println!("\n{}", palette.paint("━━━ Matched Patterns ━━━", ansi::GRAY));
    if assignment.matched.is_empty() {
        println!("{}", palette.dim("  None"));
    }
    for pattern in &assignment.matched {
        let shown = if pattern.is_empty() { "<any>" } else { pattern.as_str() };
        println!("  {}", palette.paint(shown, ansi::BLUE));
    }

    println!("\n{}", palette.paint("━━━ Steps ━━━", ansi::GRAY));
    for step in &assignment.steps {
        let shown = if step.pattern.is_empty() { "<any>" } else { step.pattern.as_str() };
        println!(
            "  {} {} {} {}",
            palette.paint(format!("p{:>2}", step.precedence), ansi::YELLOW),
            palette.paint(format!("slot {}", step.slot), ansi::GRAY),
            palette.paint(shown, ansi::CYAN),
            if step.taken.is_empty() {
                palette.dim("✗ took nothing")
            } else {
                palette.paint(format!("✓ {}", step.taken.join(", ")), ansi::GREEN)
            }
        );
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!("  Assign: {}", palette.paint(format!("{:?}", assignment.duration), ansi::GREEN));
    println!();
}

pub fn print_failure(record: &Record, claims: &[Vec<String>], err: &ClaimError, color: bool) {
    let palette = ansi::Palette::new(color);
    print_header(record, &palette);

    println!("\n{}", palette.paint("━━━ Claims ━━━", ansi::GRAY));
    for (idx, claim) in claims.iter().enumerate() {
        println!(
            "  {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.paint(claim_label(Some(claim)), ansi::CYAN)
        );
    }

    println!("\n{}", palette.paint("━━━ Error ━━━", ansi::GRAY));
    println!("  {}", palette.bold(palette.paint(err.to_string(), ansi::RED)));
    if let Some(hint) = hint_for(err) {
        println!("\n{}", palette.dim(format!("  Tip: {hint}")));
    }
    println!();
}

fn print_header(record: &Record, palette: &ansi::Palette) {
    println!(
        "\n{}",
        palette.bold(palette.paint(format!("⚙  Fields: {}", record.visible_fields().join(", ")), ansi::CYAN))
    );
    let hidden = record.hidden_fields();
    if !hidden.is_empty() {
        println!("{}", palette.dim(format!("   hidden: {}", hidden.join(", "))));
    }
}

fn claim_label(claim: Option<&Vec<String>>) -> String {
    match claim {
        Some(patterns) if !patterns.is_empty() => patterns.join(" "),
        _ => "<any>".to_string(),
    }
}

fn hint_for(err: &ClaimError) -> Option<&'static str> {
    match err {
        ClaimError::LeftoverFields { .. } => Some("add a catch-all claim (\"\") to take the remaining fields"),
        ClaimError::RequiredMatchFailed { .. } => Some("append '?' to make the pattern optional"),
        ClaimError::InvalidMatcherSyntax { .. } => Some("run with --help to list the pattern forms"),
        _ => None,
    }
}
