//! Placeholder substitution in backup scripts.

/// Replace `<format>` with `file_format` and `<parallel>` with one
/// `ALLOCATE CHANNEL` command per slave.
pub fn expand_placeholders(
    script: &str,
    file_format: &str,
    parallel_slaves: u32,
    channel_device: &str,
) -> String {
    let channels = (0..parallel_slaves)
        .map(|i| format!("ALLOCATE CHANNEL C{} DEVICE TYPE {};", i, channel_device))
        .collect::<Vec<_>>()
        .join("\n");

    let mut expanded = String::with_capacity(script.len());
    for line in script.lines() {
        expanded.push_str(
            &line
                .replace("<format>", file_format)
                .replace("<parallel>", &channels),
        );
        expanded.push('\n');
    }
    expanded
}
