//! The evaluation result tree and its three serialization shapes.

use crate::options::OutputFormat;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Outcome of applying one schema object at one instance location.
///
/// Nodes mirror the evaluation path: each applicator descent produces one
/// nested node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultNode {
    pub evaluation_path: String,
    pub instance_location: String,
    pub absolute_keyword_location: String,
    pub valid: bool,
    /// Keyword name → rendered message.
    pub errors: BTreeMap<String, String>,
    /// Keyword name → annotation value.
    pub annotations: BTreeMap<String, Value>,
    pub nested: Vec<ResultNode>,
}

impl ResultNode {
    pub(crate) fn new(
        evaluation_path: String,
        instance_location: String,
        absolute_keyword_location: String,
    ) -> Self {
        ResultNode {
            evaluation_path,
            instance_location,
            absolute_keyword_location,
            valid: true,
            errors: BTreeMap::new(),
            annotations: BTreeMap::new(),
            nested: Vec::new(),
        }
    }

    /// Collects annotation values for the given keywords from this node and
    /// every valid descendant evaluated at `instance_location`.
    ///
    /// This is the consumption side of `unevaluatedProperties` and
    /// `unevaluatedItems`: annotations under failed subschemas are dropped,
    /// and annotations recorded against a different instance location belong
    /// to some child instance, not this one.
    pub fn collect_annotations(
        &self,
        instance_location: &str,
        keywords: &[&str],
        out: &mut Vec<Value>,
    ) {
        for (name, value) in &self.annotations {
            if keywords.contains(&name.as_str()) {
                out.push(value.clone());
            }
        }
        for child in &self.nested {
            if child.valid && child.instance_location == instance_location {
                child.collect_annotations(instance_location, keywords, out);
            }
        }
    }

    fn unit(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("valid".to_string(), json!(self.valid));
        obj.insert(
            "evaluationPath".to_string(),
            json!(self.evaluation_path),
        );
        obj.insert(
            "instanceLocation".to_string(),
            json!(self.instance_location),
        );
        obj.insert(
            "absoluteKeywordLocation".to_string(),
            json!(self.absolute_keyword_location),
        );
        if !self.errors.is_empty() {
            obj.insert("errors".to_string(), json!(self.errors));
        }
        if !self.annotations.is_empty() {
            obj.insert("annotations".to_string(), json!(self.annotations));
        }
        Value::Object(obj)
    }

    fn to_hierarchical(&self) -> Value {
        let mut value = self.unit();
        if !self.nested.is_empty() {
            let details: Vec<Value> = self.nested.iter().map(|n| n.to_hierarchical()).collect();
            value
                .as_object_mut()
                .unwrap()
                .insert("details".to_string(), Value::Array(details));
        }
        value
    }

    fn flatten(&self, out: &mut Vec<Value>) {
        out.push(self.unit());
        for child in &self.nested {
            child.flatten(out);
        }
    }
}

/// The result of one evaluation, remembering the format it was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResults {
    pub root: ResultNode,
    format: OutputFormat,
}

impl EvaluationResults {
    pub(crate) fn new(root: ResultNode, format: OutputFormat) -> Self {
        EvaluationResults { root, format }
    }

    pub fn valid(&self) -> bool {
        self.root.valid
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Serializes in the shape the evaluation was run for.
    pub fn to_value(&self) -> Value {
        match self.format {
            OutputFormat::Flag => json!({ "valid": self.root.valid }),
            OutputFormat::List => {
                let mut details = Vec::new();
                self.root.flatten(&mut details);
                json!({ "valid": self.root.valid, "details": details })
            }
            OutputFormat::Hierarchical => self.root.to_hierarchical(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(path: &str, loc: &str, valid: bool) -> ResultNode {
        let mut n = ResultNode::new(path.to_string(), loc.to_string(), format!("s#{}", path));
        n.valid = valid;
        n
    }

    #[test]
    fn test_collect_skips_invalid_and_foreign_locations() {
        let mut root = node("", "", true);
        root.annotations
            .insert("properties".to_string(), json!(["a"]));

        let mut ok_child = node("/allOf/0", "", true);
        ok_child
            .annotations
            .insert("properties".to_string(), json!(["b"]));

        let mut bad_child = node("/allOf/1", "", false);
        bad_child
            .annotations
            .insert("properties".to_string(), json!(["c"]));

        let mut other_loc = node("/properties/a", "/a", true);
        other_loc
            .annotations
            .insert("properties".to_string(), json!(["d"]));

        root.nested = vec![ok_child, bad_child, other_loc];

        let mut out = Vec::new();
        root.collect_annotations("", &["properties"], &mut out);
        assert_eq!(out, vec![json!(["a"]), json!(["b"])]);
    }

    #[test]
    fn test_flag_output() {
        let results = EvaluationResults::new(node("", "", false), OutputFormat::Flag);
        assert_eq!(results.to_value(), json!({"valid": false}));
    }

    #[test]
    fn test_list_output_flattens() {
        let mut root = node("", "", true);
        root.nested.push(node("/properties/a", "/a", true));
        let results = EvaluationResults::new(root, OutputFormat::List);
        let value = results.to_value();
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["details"].as_array().unwrap().len(), 2);
    }
}
