use regex::Regex;

/// Fixed harmless fallback for image values that fail the allow-list:
/// a 1x1 transparent GIF.
pub const PLACEHOLDER_IMAGE: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

const ALLOWED_DATA_PREFIXES: [&str; 4] = [
    "data:image/jpeg;base64,",
    "data:image/png;base64,",
    "data:image/gif;base64,",
    "data:image/webp;base64,",
];

/// Validates an image value against the render allow-list. Decoded quizzes
/// can be attacker-supplied (shared via URL), so anything outside the list
/// is replaced with [`PLACEHOLDER_IMAGE`] before it reaches a rendering
/// surface.
pub fn sanitize_image_source(value: &str) -> &str {
    let allowed = ALLOWED_DATA_PREFIXES.iter().any(|p| value.starts_with(p))
        || value.starts_with("local:")
        || value.starts_with("http://")
        || value.starts_with("https://");
    if allowed {
        value
    } else {
        PLACEHOLDER_IMAGE
    }
}

/// Counts the literal `___` blank slots in a fill-blank prompt. Runs of
/// three or more underscores count as a single slot.
pub fn blank_slots(prompt: &str) -> usize {
    let pattern = Regex::new(r"_{3,}").unwrap();
    pattern.find_iter(prompt).count()
}

/// Wires up logging to stdout. Call once from the embedding application.
pub fn init_logging(verbose: bool) -> Result<(), fern::InitError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
