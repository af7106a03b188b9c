pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_cases.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_cases.sql")),
				"tables/002_generated_notes.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_generated_notes.sql")),
				"tables/003_rubrics.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_rubrics.sql")),
				"tables/004_scores.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_scores.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
