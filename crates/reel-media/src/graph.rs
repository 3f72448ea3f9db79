//! Filter-graph program representation.
//!
//! A [`CompiledProgram`] is an ordered list of [`FilterStage`]s plus the
//! inputs and encoding bundle needed to run it. Stages render to FFmpeg's
//! `-filter_complex` grammar: `[in]filter=a=1:b=2,filter2[out]`, stages
//! joined with `;`.

use std::collections::HashSet;
use std::path::PathBuf;

use reel_models::EncodingProfile;

use crate::error::{MediaError, MediaResult};
use crate::labels::StreamLabel;

/// Format seconds/numbers compactly and deterministically (max 3 decimals).
pub fn num(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// One filter invocation with its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    name: String,
    params: Vec<(Option<String>, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Add a `key=value` option.
    pub fn arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((Some(key.into()), value.to_string()));
        self
    }

    /// Add a positional option.
    pub fn positional(mut self, value: impl ToString) -> Self {
        self.params.push((None, value.to_string()));
        self
    }

    /// Filter name as written in the graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a keyed option.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize as `name=opt:opt`.
    pub fn render(&self) -> String {
        if self.params.is_empty() {
            return self.name.clone();
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| match k {
                Some(k) => format!("{}={}", k, v),
                None => v.clone(),
            })
            .collect();
        format!("{}={}", self.name, params.join(":"))
    }
}

/// Inputs → comma-chained filters → outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStage {
    pub inputs: Vec<StreamLabel>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<StreamLabel>,
}

impl FilterStage {
    pub fn new(inputs: Vec<StreamLabel>, filters: Vec<Filter>, outputs: Vec<StreamLabel>) -> Self {
        Self {
            inputs,
            filters,
            outputs,
        }
    }

    /// One input, a filter chain, one output.
    pub fn chain(input: StreamLabel, filters: Vec<Filter>, output: StreamLabel) -> Self {
        Self::new(vec![input], filters, vec![output])
    }

    /// A generator stage with no inputs (e.g. `color`).
    pub fn source(filter: Filter, output: StreamLabel) -> Self {
        Self::new(Vec::new(), vec![filter], vec![output])
    }

    /// Whether any filter of this stage is named `name`.
    pub fn uses(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name() == name)
    }

    /// First filter of this stage named `name`.
    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name() == name)
    }

    /// Serialize as `[in]chain[out]`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for input in &self.inputs {
            out.push_str(&input.bracketed());
        }
        let chain: Vec<String> = self.filters.iter().map(Filter::render).collect();
        out.push_str(&chain.join(","));
        for output in &self.outputs {
            out.push_str(&output.bracketed());
        }
        out
    }
}

/// Stages produced by a builder together with the label carrying its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub stages: Vec<FilterStage>,
    pub output: StreamLabel,
}

impl Fragment {
    /// Fragment made of one stage.
    pub fn single(stage: FilterStage, output: StreamLabel) -> Self {
        Self {
            stages: vec![stage],
            output,
        }
    }
}

/// One engine input file and the options placed before its `-i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub options: Vec<String>,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: Vec::new(),
        }
    }

    /// Input options placed before `-i`.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }
}

/// A complete, ordered filter program ready for the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub inputs: Vec<InputFile>,
    pub stages: Vec<FilterStage>,
    pub video_out: StreamLabel,
    pub audio_out: Option<StreamLabel>,
    pub encoding: EncodingProfile,
    /// Composition length in seconds; the progress denominator
    pub total_duration: f64,
}

impl CompiledProgram {
    /// Serialized `-filter_complex` value.
    pub fn filter_graph(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::render)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Stages that use the filter `name`, in program order.
    pub fn stages_using(&self, name: &str) -> Vec<&FilterStage> {
        self.stages.iter().filter(|s| s.uses(name)).collect()
    }

    /// Static graph checks.
    ///
    /// - every output label is unique
    /// - every input was produced by a strictly earlier stage, or is a pad
    ///   of a declared input file
    /// - every produced label is consumed at most once
    /// - the final outputs exist and are left for `-map`
    pub fn validate(&self) -> MediaResult<()> {
        let mut produced: HashSet<&StreamLabel> = HashSet::new();
        let mut consumed: HashSet<&StreamLabel> = HashSet::new();

        for (i, stage) in self.stages.iter().enumerate() {
            if stage.filters.is_empty() {
                return Err(MediaError::invalid_graph(format!("Stage {} has no filters", i)));
            }

            for input in &stage.inputs {
                if input.is_input_pad() {
                    match input.input_index() {
                        Some(idx) if idx < self.inputs.len() => {}
                        _ => {
                            return Err(MediaError::invalid_graph(format!(
                                "Stage {} reads undeclared input {}",
                                i, input
                            )))
                        }
                    }
                    continue;
                }
                if !produced.contains(input) {
                    return Err(MediaError::invalid_graph(format!(
                        "Stage {} reads {} before it is produced",
                        i, input
                    )));
                }
                if !consumed.insert(input) {
                    return Err(MediaError::invalid_graph(format!(
                        "Label {} is consumed more than once",
                        input
                    )));
                }
            }

            for output in &stage.outputs {
                if output.is_input_pad() {
                    return Err(MediaError::invalid_graph(format!(
                        "Stage {} writes to input pad {}",
                        i, output
                    )));
                }
                if !produced.insert(output) {
                    return Err(MediaError::invalid_graph(format!(
                        "Label {} is produced more than once",
                        output
                    )));
                }
            }
        }

        for out in std::iter::once(&self.video_out).chain(self.audio_out.iter()) {
            if !produced.contains(out) {
                return Err(MediaError::invalid_graph(format!("Output {} is never produced", out)));
            }
            if consumed.contains(out) {
                return Err(MediaError::invalid_graph(format!(
                    "Output {} is consumed inside the graph",
                    out
                )));
            }
        }

        Ok(())
    }
}
