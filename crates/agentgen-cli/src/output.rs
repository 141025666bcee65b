use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned columns separated by two spaces, indented by `indent`.
pub fn print_table(indent: usize, headers: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(String::len)
                .fold(h.len(), usize::max)
        })
        .collect();

    print_row(indent, &widths, headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    print_row(indent, &widths, &rule);
    for row in rows {
        print_row(indent, &widths, row);
    }
}

fn print_row<S: AsRef<str>>(indent: usize, widths: &[usize], cells: &[S]) {
    let joined = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{:<w$}", c.as_ref()))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{:indent$}{}", "", joined.trim_end());
}
