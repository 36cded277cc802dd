//! Line-preserving diagnostics: a shader compile log references lines in the
//! single concatenated source the driver actually saw, but the caller wants
//! to know which named template part an error line belongs to, and at what
//! line *within that part*. This module maps one to the other.

/// Find `id(line):rest` — the first `(` in the line, followed by an
/// unsigned integer, followed by `)`. Returns the parsed line number and the
/// byte index of everything after the closing paren.
fn find_paren_form(line: &str) -> Option<(usize, usize)> {
    let open = line.find('(')?;
    let after_open = &line[open + 1..];
    let close_rel = after_open.find(')')?;
    let digits = &after_open[..close_rel];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let line_no: usize = digits.parse().ok()?;
    Some((line_no, open + 1 + close_rel + 1))
}

/// Find `id:line:rest` — digits between the first and second colon.
fn find_colon_form(line: &str) -> Option<(usize, usize)> {
    let first_colon = line.find(':')?;
    let rest = &line[first_colon + 1..];
    let second_colon_rel = rest.find(':')?;
    let digits = &rest[..second_colon_rel];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let line_no: usize = digits.parse().ok()?;
    Some((line_no, first_colon + 1 + second_colon_rel))
}

/// Rewrite a driver compile log given the line count of each template part,
/// in the order the parts were concatenated into the source the driver
/// compiled. A log line of the form `<id>(<k>): …` or `<id>:<k>:…` where `k`
/// falls within part `j`'s span is rewritten to `<name[j]>(<local>): …`
/// where `local = k - sum(counts[..j])`. Lines whose line number falls
/// outside every part's span, or that don't match either form, pass through
/// unchanged.
pub fn rewrite_log_with_counts(log: &str, counts: &[(String, usize)]) -> String {
    let mut prefix_sums = Vec::with_capacity(counts.len());
    let mut running = 0usize;
    for (name, count) in counts {
        prefix_sums.push((name.clone(), running, running + count));
        running += count;
    }

    log.lines()
        .map(|line| rewrite_line(line, &prefix_sums))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_line(line: &str, prefix_sums: &[(String, usize, usize)]) -> String {
    let parsed = find_paren_form(line).or_else(|| find_colon_form(line));
    let Some((k, rest_start)) = parsed else {
        return line.to_string();
    };

    for (name, start, end) in prefix_sums {
        if k >= *start && k < *end {
            let local = k - start;
            let rest = &line[rest_start..];
            return format!("{name}({local}){rest}");
        }
    }
    line.to_string()
}

/// Convenience wrapper over (name, source) pairs: derives each part's line
/// count as its newline count, then delegates to
/// [`rewrite_log_with_counts`].
pub fn rewrite_log(log: &str, parts: &[(String, String)]) -> String {
    let counts: Vec<(String, usize)> = parts
        .iter()
        .map(|(name, source)| (name.clone(), source.matches('\n').count()))
        .collect();
    rewrite_log_with_counts(log, &counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> Vec<(String, usize)> {
        vec![
            ("header".to_string(), 3),
            ("body".to_string(), 5),
            ("footer".to_string(), 2),
        ]
    }

    #[test]
    fn rewrites_paren_form_within_range() {
        let log = "0(4): error: undeclared identifier 'foo'";
        let rewritten = rewrite_log_with_counts(log, &counts());
        assert_eq!(rewritten, "body(1): error: undeclared identifier 'foo'");
    }

    #[test]
    fn rewrites_colon_form_within_range() {
        let log = "0:0:error: syntax error";
        let rewritten = rewrite_log_with_counts(log, &counts());
        assert_eq!(rewritten, "header(0):error: syntax error");
    }

    #[test]
    fn passes_through_out_of_range_lines_verbatim() {
        let log = "0(99): error: whatever";
        let rewritten = rewrite_log_with_counts(log, &counts());
        assert_eq!(rewritten, log);
    }

    #[test]
    fn passes_through_unparseable_lines_verbatim() {
        let log = "note: see also previous definition";
        let rewritten = rewrite_log_with_counts(log, &counts());
        assert_eq!(rewritten, log);
    }

    #[test]
    fn handles_multi_line_logs_independently() {
        let log = "0(0): error: a\n0(8): error: b";
        let rewritten = rewrite_log_with_counts(log, &counts());
        assert_eq!(rewritten, "header(0): error: a\nfooter(0): error: b");
    }

    #[test]
    fn derives_counts_from_newline_occurrences() {
        let parts = vec![
            ("a".to_string(), "line1\nline2\nline3".to_string()), // 2 newlines
            ("b".to_string(), "x\ny".to_string()),                // 1 newline
        ];
        let rewritten = rewrite_log("0(2): error: in b", &parts);
        assert_eq!(rewritten, "b(0): error: in b");
    }
}
