//! The evaluation context: a stack of frames, one per schema application.
//!
//! Each frame pairs an instance location with a schema and an in-progress
//! result node. Applicators push a frame, evaluate it, pop the finished node
//! and attach it under the parent. The frame stack doubles as the dynamic
//! scope for `$dynamicRef`/`$recursiveRef` and as the cycle ledger: a
//! `(schema location, instance location)` pair recurring on the stack means
//! a reference chain is consuming no instance and evaluation aborts.

use crate::error::SchemaError;
use crate::keyword::Keyword;
use crate::keywords;
use crate::messages;
use crate::options::{EvalOptions, OutputFormat, TraceEvent};
use crate::registry::SchemaRegistry;
use crate::result::{EvaluationResults, ResultNode};
use crate::schema::{Schema, SchemaKind};
use crate::vocabulary::VocabularySet;
use jsonworks_value::pointer;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

pub(crate) struct Frame<'i> {
    pub instance: Cow<'i, Value>,
    pub instance_location: String,
    pub evaluation_path: String,
    pub schema: Arc<Schema>,
    pub result: ResultNode,
    pub vocab: VocabularySet,
    /// Whether annotations must be kept: any non-Flag output, or an
    /// unevaluated-* keyword on this schema or an ancestor frame.
    pub collect_annotations: bool,
}

pub struct EvalContext<'i> {
    registry: &'i SchemaRegistry,
    options: &'i EvalOptions,
    frames: Vec<Frame<'i>>,
}

fn join_path(base: &str, tokens: &[&str]) -> String {
    let mut path = base.to_string();
    for token in tokens {
        path = pointer::append(&path, token);
    }
    path
}

fn active_vocabularies(schema: &Schema, registry: &SchemaRegistry) -> VocabularySet {
    if !schema.draft.has_vocabularies() {
        return VocabularySet::DEFAULT;
    }
    let meta_uri = match &schema.meta_uri {
        Some(uri) => uri,
        None => return VocabularySet::DEFAULT,
    };
    match registry.lookup(meta_uri).and_then(|r| r.vocabulary.clone()) {
        Some(map) => VocabularySet::from_meta(&map),
        None => VocabularySet::DEFAULT,
    }
}

impl<'i> EvalContext<'i> {
    /// Runs one full evaluation. The context lives exactly as long as the
    /// call; the result tree outlives it.
    pub(crate) fn run(
        schema: Arc<Schema>,
        instance: &'i Value,
        registry: &'i SchemaRegistry,
        options: &'i EvalOptions,
    ) -> Result<EvaluationResults, SchemaError> {
        let mut ctx = EvalContext {
            registry,
            options,
            frames: Vec::new(),
        };
        ctx.push_frame(
            Cow::Borrowed(instance),
            String::new(),
            String::new(),
            schema,
        )?;
        ctx.evaluate_top()?;
        let root = ctx.pop_frame();
        Ok(EvaluationResults::new(root, options.output_format))
    }

    fn top(&self) -> &Frame<'i> {
        self.frames.last().expect("frame stack is never empty mid-evaluation")
    }

    pub(crate) fn registry(&self) -> &'i SchemaRegistry {
        self.registry
    }

    pub(crate) fn options(&self) -> &'i EvalOptions {
        self.options
    }

    pub(crate) fn instance(&self) -> &Value {
        &self.top().instance
    }

    pub(crate) fn schema(&self) -> &Arc<Schema> {
        &self.top().schema
    }

    pub(crate) fn current_base(&self) -> &str {
        &self.top().schema.base_uri
    }

    pub(crate) fn vocab(&self) -> VocabularySet {
        self.top().vocab
    }

    /// False only in Flag output with no annotation-dependent ancestor;
    /// enables short-circuiting.
    pub(crate) fn collecting(&self) -> bool {
        self.top().collect_annotations
    }

    /// Base URIs of the schema resources on the stack, outermost first.
    pub(crate) fn dynamic_scope(&self) -> Vec<String> {
        let mut uris: Vec<String> = Vec::new();
        for frame in &self.frames {
            if uris.last().map(|u| u != &frame.schema.base_uri).unwrap_or(true) {
                uris.push(frame.schema.base_uri.clone());
            }
        }
        uris
    }

    fn trace(&self, message: &str) {
        if let Some(trace) = &self.options.trace {
            let top = self.top();
            trace(TraceEvent {
                evaluation_path: &top.evaluation_path,
                instance_location: &top.instance_location,
                message,
            });
        }
    }

    // ── Result recording ───────────────────────────────────────────────────

    /// Records a failure for a keyword on the current frame.
    pub(crate) fn fail(&mut self, keyword: &str, message_key: &str, tokens: &[(&str, Value)]) {
        let message = messages::render(message_key, tokens);
        self.trace(&message);
        let top = self.frames.last_mut().unwrap();
        top.result.valid = false;
        top.result.errors.insert(keyword.to_string(), message);
    }

    /// Records an annotation on the current frame, visible to later sibling
    /// keywords and to ancestor aggregators.
    pub(crate) fn annotate(&mut self, keyword: &str, value: Value) {
        let top = self.frames.last_mut().unwrap();
        top.result.annotations.insert(keyword.to_string(), value);
    }

    pub(crate) fn annotation(&self, keyword: &str) -> Option<&Value> {
        self.top().result.annotations.get(keyword)
    }

    /// Attaches a finished child result under the current frame.
    pub(crate) fn attach(&mut self, node: ResultNode) {
        self.frames.last_mut().unwrap().result.nested.push(node);
    }

    /// Annotations of the given keywords from the current frame and every
    /// valid descendant at the same instance location.
    pub(crate) fn collect_local_annotations(&self, keywords: &[&str]) -> Vec<Value> {
        let top = self.top();
        let mut out = Vec::new();
        top.result
            .collect_annotations(&top.instance_location, keywords, &mut out);
        out
    }

    // ── Frame stack ────────────────────────────────────────────────────────

    fn push_frame(
        &mut self,
        instance: Cow<'i, Value>,
        instance_location: String,
        evaluation_path: String,
        schema: Arc<Schema>,
    ) -> Result<(), SchemaError> {
        for frame in &self.frames {
            if frame.schema.location == schema.location
                && frame.instance_location == instance_location
            {
                return Err(SchemaError::CycleDetected {
                    schema_location: schema.location.clone(),
                    instance_location,
                });
            }
        }
        let collect = self.options.output_format != OutputFormat::Flag
            || schema.has_unevaluated
            || self
                .frames
                .last()
                .map(|f| f.collect_annotations)
                .unwrap_or(false);
        let vocab = active_vocabularies(&schema, self.registry);
        let result = ResultNode::new(
            evaluation_path.clone(),
            instance_location.clone(),
            schema.location.clone(),
        );
        self.frames.push(Frame {
            instance,
            instance_location,
            evaluation_path,
            schema,
            result,
            vocab,
            collect_annotations: collect,
        });
        Ok(())
    }

    fn pop_frame(&mut self) -> ResultNode {
        self.frames.pop().expect("pop without matching push").result
    }

    /// Runs every active keyword of the current frame's schema, in priority
    /// order, honoring the Flag-mode short-circuit.
    pub(crate) fn evaluate_top(&mut self) -> Result<(), SchemaError> {
        let schema = self.top().schema.clone();
        match &schema.kind {
            SchemaKind::Bool(true) => Ok(()),
            SchemaKind::Bool(false) => {
                self.fail("", "FalseSchema", &[]);
                Ok(())
            }
            SchemaKind::Keyed(instances) => {
                for inst in instances {
                    if let Some(vocabulary) = inst.vocabulary {
                        if !self.top().vocab.contains(vocabulary) {
                            continue;
                        }
                    } else if let Keyword::Unknown(raw) = &inst.keyword {
                        if self.options.process_custom_keywords {
                            self.annotate(&inst.name, raw.clone());
                        }
                        continue;
                    }
                    keywords::evaluate_keyword(inst, self)?;
                    if !self.top().collect_annotations && !self.top().result.valid {
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    // ── Applicator descent ─────────────────────────────────────────────────

    /// Evaluates a subschema against the current instance.
    pub(crate) fn apply(
        &mut self,
        schema: &Arc<Schema>,
        eval_tokens: &[&str],
    ) -> Result<ResultNode, SchemaError> {
        let top = self.top();
        let instance = top.instance.clone();
        let instance_location = top.instance_location.clone();
        let evaluation_path = join_path(&top.evaluation_path, eval_tokens);
        self.push_frame(instance, instance_location, evaluation_path, schema.clone())?;
        self.evaluate_top()?;
        Ok(self.pop_frame())
    }

    /// Evaluates a subschema against a named property of the current
    /// (object) instance.
    pub(crate) fn apply_at_property(
        &mut self,
        schema: &Arc<Schema>,
        eval_tokens: &[&str],
        name: &str,
    ) -> Result<ResultNode, SchemaError> {
        let top = self.top();
        let child: Cow<'i, Value> = match &top.instance {
            Cow::Borrowed(inner) => match inner.get(name) {
                Some(c) => Cow::Borrowed(c),
                None => Cow::Owned(Value::Null),
            },
            Cow::Owned(owned) => Cow::Owned(owned.get(name).cloned().unwrap_or(Value::Null)),
        };
        let instance_location = pointer::append(&top.instance_location, name);
        let evaluation_path = join_path(&top.evaluation_path, eval_tokens);
        self.push_frame(child, instance_location, evaluation_path, schema.clone())?;
        self.evaluate_top()?;
        Ok(self.pop_frame())
    }

    /// Evaluates a subschema against an element of the current (array)
    /// instance.
    pub(crate) fn apply_at_index(
        &mut self,
        schema: &Arc<Schema>,
        eval_tokens: &[&str],
        index: usize,
    ) -> Result<ResultNode, SchemaError> {
        let top = self.top();
        let child: Cow<'i, Value> = match &top.instance {
            Cow::Borrowed(inner) => match inner.get(index) {
                Some(c) => Cow::Borrowed(c),
                None => Cow::Owned(Value::Null),
            },
            Cow::Owned(owned) => Cow::Owned(owned.get(index).cloned().unwrap_or(Value::Null)),
        };
        let instance_location = pointer::append_index(&top.instance_location, index);
        let evaluation_path = join_path(&top.evaluation_path, eval_tokens);
        self.push_frame(child, instance_location, evaluation_path, schema.clone())?;
        self.evaluate_top()?;
        Ok(self.pop_frame())
    }

    /// Evaluates a subschema against a synthesized value (used by
    /// `propertyNames`, where the instance is a property name that has no
    /// addressable location of its own).
    pub(crate) fn apply_to_value(
        &mut self,
        schema: &Arc<Schema>,
        eval_tokens: &[&str],
        value: Value,
    ) -> Result<ResultNode, SchemaError> {
        let top = self.top();
        let instance_location = top.instance_location.clone();
        let evaluation_path = join_path(&top.evaluation_path, eval_tokens);
        self.push_frame(
            Cow::Owned(value),
            instance_location,
            evaluation_path,
            schema.clone(),
        )?;
        self.evaluate_top()?;
        Ok(self.pop_frame())
    }
}
