//! Extract (§4.G): pulls an expression into a local variable, or a
//! contiguous block of statements into a new top-level function.

use super::{RefactoringOperation, ValidationResult};
use crate::change::Change;
use crate::error::Result;
use crate::resource::{Project, ResourcePath};

pub struct ExtractVariable {
    pub module: ResourcePath,
    pub start: usize,
    pub end: usize,
    pub name: String,
}

impl RefactoringOperation for ExtractVariable {
    fn name(&self) -> &'static str {
        "extract-variable"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        if self.start >= self.end || self.end > text.len() {
            return Ok(ValidationResult::error("selection is empty or out of range"));
        }
        if text[self.start..self.end].trim().is_empty() {
            return Ok(ValidationResult::error("selection contains no expression"));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;

        let line_start = old_text[..self.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let indent: String = old_text[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let expr = &old_text[self.start..self.end];

        let mut new_text = String::with_capacity(old_text.len() + expr.len() + 16);
        new_text.push_str(&old_text[..line_start]);
        new_text.push_str(&indent);
        new_text.push_str(&self.name);
        new_text.push_str(" = ");
        new_text.push_str(expr);
        new_text.push('\n');
        new_text.push_str(&old_text[line_start..self.start]);
        new_text.push_str(&self.name);
        new_text.push_str(&old_text[self.end..]);

        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

pub struct ExtractMethod {
    pub module: ResourcePath,
    pub start: usize,
    pub end: usize,
    pub name: String,
}

impl RefactoringOperation for ExtractMethod {
    fn name(&self) -> &'static str {
        "extract-method"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        if self.start >= self.end || self.end > text.len() {
            return Ok(ValidationResult::error("selection is empty or out of range"));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;

        let block_start = old_text[..self.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let block_end = old_text[self.end..]
            .find('\n')
            .map(|i| self.end + i + 1)
            .unwrap_or(old_text.len());

        let block = &old_text[block_start..block_end];
        let base_indent: String = block.chars().take_while(|c| *c == ' ' || *c == '\t').collect();

        let mut body = String::new();
        for line in block.lines() {
            let dedented = line.strip_prefix(base_indent.as_str()).unwrap_or(line);
            body.push_str("    ");
            body.push_str(dedented);
            body.push('\n');
        }

        let mut new_text = String::with_capacity(old_text.len() + body.len() + 32);
        new_text.push_str(&old_text[..block_start]);
        new_text.push_str(&base_indent);
        new_text.push_str(&self.name);
        new_text.push_str("()\n");
        new_text.push_str(&old_text[block_end..]);
        new_text.push_str("\n\ndef ");
        new_text.push_str(&self.name);
        new_text.push_str("():\n");
        new_text.push_str(&body);

        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extracts_variable() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f():\n    return 1 + 2\n").unwrap();

        let text = file.read().unwrap();
        let start = text.find("1 + 2").unwrap();
        let end = start + "1 + 2".len();
        let op = ExtractVariable {
            module: file.path().clone(),
            start,
            end,
            name: "total".to_string(),
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("total = 1 + 2"));
        assert!(updated.contains("return total"));
    }

    #[test]
    fn extracts_method() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f():\n    x = 1\n    print(x)\n").unwrap();

        let text = file.read().unwrap();
        let start = text.find("print(x)\n").unwrap();
        let end = start + "print(x)\n".len();
        let op = ExtractMethod {
            module: file.path().clone(),
            start,
            end,
            name: "log_it".to_string(),
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("log_it()"));
        assert!(updated.contains("def log_it():"));
        assert!(updated.contains("    print(x)"));
    }
}
