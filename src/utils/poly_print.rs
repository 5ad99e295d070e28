//! Printing regions and relations.
//!
//! Finite relations are printed as explicit unions of tuples in isl-like
//! notation, e.g. `{ S0[0] -> [0, 0, 0]; S0[1] -> [0, 1, 0] }`.

use crate::analysis::{Scop, ScopStmt};
use crate::polyhedral::points::format_tuple;
use crate::polyhedral::{PointRelation, PointSet};

/// Pretty printer for regions.
pub struct PolyPrinter {
    /// Indentation level
    indent: usize,
    /// Output buffer
    buffer: String,
}

impl PolyPrinter {
    /// Create a new printer.
    pub fn new() -> Self {
        Self {
            indent: 0,
            buffer: String::new(),
        }
    }

    /// Get the output.
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Take the output.
    pub fn take_output(self) -> String {
        self.buffer
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buffer.push_str("  ");
        }
    }

    fn line(&mut self, text: &str) {
        self.write_indent();
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Print a set with an optional tuple name.
    pub fn print_points(&mut self, name: &str, set: &PointSet) {
        let tuples: Vec<String> = set.iter()
            .map(|p| format!("{}{}", name, format_tuple(p)))
            .collect();
        self.buffer.push_str(&format!("{{ {} }}", tuples.join("; ")));
    }

    /// Print a relation with an optional input tuple name.
    pub fn print_relation(&mut self, name: &str, rel: &PointRelation) {
        let pairs: Vec<String> = rel.iter()
            .map(|(x, y)| format!("{}{} -> {}", name, format_tuple(x), format_tuple(y)))
            .collect();
        self.buffer.push_str(&format!("{{ {} }}", pairs.join("; ")));
    }

    /// Print a statement.
    pub fn print_stmt(&mut self, stmt: &ScopStmt) {
        self.line(&format!("Statement {}:", stmt.name));
        self.indent += 1;
        self.write_indent();
        self.buffer.push_str("Domain: ");
        self.print_points(&stmt.name, &stmt.domain);
        self.buffer.push('\n');
        self.write_indent();
        self.buffer.push_str("Schedule: ");
        self.print_relation(&stmt.name, &stmt.schedule);
        self.buffer.push('\n');
        self.indent -= 1;
    }

    /// Print a whole region.
    pub fn print_scop(&mut self, scop: &Scop) {
        self.line(&format!("SCoP: {}", scop.name));
        let params: Vec<String> = scop.context.param_names().iter()
            .zip(scop.context.param_values())
            .map(|(n, v)| format!("{} = {}", n, v))
            .collect();
        self.line(&format!("Parameters: [{}]", params.join(", ")));
        self.line(&format!("Schedule width: {}", scop.schedule_width()));
        self.line(&format!("Optimized: {}", scop.optimized));
        self.buffer.push('\n');

        self.line(&format!("Statements ({}):", scop.statements.len()));
        for stmt in &scop.statements {
            self.print_stmt(stmt);
        }
        self.buffer.push('\n');

        self.line(&format!("Labels ({}):", scop.labels.len()));
        self.indent += 1;
        for (name, info) in scop.labels.iter() {
            self.line(&format!("{} (depth {}): {} instances", name, info.depth, info.domain.len()));
        }
        self.indent -= 1;
        self.buffer.push('\n');

        for text in scop.dependences.summary().to_string().lines() {
            self.line(text);
        }
        self.indent += 1;
        for dep in &scop.dependences.relations {
            self.line(&dep.description());
        }
        self.indent -= 1;
    }

    /// Print only the statement schedules.
    pub fn print_schedules(&mut self, scop: &Scop) {
        for stmt in &scop.statements {
            self.print_relation(&stmt.name, &stmt.schedule);
            self.buffer.push('\n');
        }
    }
}

impl Default for PolyPrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a region to a string.
pub fn print_scop(scop: &Scop) -> String {
    let mut printer = PolyPrinter::new();
    printer.print_scop(scop);
    printer.take_output()
}

/// Print the statement schedules of a region to a string.
pub fn print_schedules(scop: &Scop) -> String {
    let mut printer = PolyPrinter::new();
    printer.print_schedules(scop);
    printer.take_output()
}

/// Print a schedule-space transform to a string.
pub fn print_transform(transform: &PointRelation) -> String {
    let mut printer = PolyPrinter::new();
    printer.print_relation("", transform);
    printer.take_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DependenceInfo;
    use crate::polyhedral::Context;
    use crate::transform::LabelTable;

    fn scop() -> Scop {
        let domain = PointSet::from_points(1, vec![vec![0], vec![1]]);
        let schedule = PointRelation::from_pairs(1, 3, vec![
            (vec![0], vec![0, 0, 0]),
            (vec![1], vec![0, 1, 0]),
        ]);
        Scop {
            name: "tiny".into(),
            context: Context::with_params([("N", 2)]),
            statements: vec![ScopStmt::new("S0", domain, schedule)],
            labels: LabelTable::new(),
            dependences: DependenceInfo::unavailable(),
            optimized: false,
        }
    }

    #[test]
    fn test_print_schedules() {
        assert_eq!(print_schedules(&scop()), "{ S0[0] -> [0, 0, 0]; S0[1] -> [0, 1, 0] }\n");
    }

    #[test]
    fn test_print_scop() {
        let output = print_scop(&scop());
        assert!(output.contains("SCoP: tiny"));
        assert!(output.contains("Parameters: [N = 2]"));
        assert!(output.contains("Domain: { S0[0]; S0[1] }"));
        assert!(output.contains("unavailable"));
    }

    #[test]
    fn test_print_transform() {
        let t = PointSet::singleton(vec![0, 1, 0]).identity();
        assert_eq!(print_transform(&t), "{ [0, 1, 0] -> [0, 1, 0] }");
    }
}
