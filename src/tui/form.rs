//! Form state for the interactive front-end.
//!
//! Kept free of terminal code so it can be unit tested. Values always stay
//! inside their field's range: this is the input boundary that guarantees the
//! ranges the assembler does not re-check.

use crate::domain::{FeatureRecord, FeatureSchema};

pub struct FormState {
    schema: &'static FeatureSchema,
    values: Vec<f64>,
    selected: usize,
    /// Text being typed for the selected field, if editing.
    edit_buffer: Option<String>,
}

/// What happened when an edit was committed.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied(f64),
    Clamped { requested: f64, applied: f64 },
    Invalid(String),
    NotEditing,
}

impl FormState {
    pub fn new(schema: &'static FeatureSchema) -> Self {
        Self {
            schema,
            values: schema.fields.iter().map(|f| f.default).collect(),
            selected: 0,
            edit_buffer: None,
        }
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.values.len() {
            self.selected += 1;
        }
    }

    /// Step the selected value by `steps` increments, clamped to range.
    pub fn adjust(&mut self, steps: f64) {
        let f = &self.schema.fields[self.selected];
        let v = self.values[self.selected] + steps * f.step;
        self.values[self.selected] = f.clamp(round_to_step(v, f.step));
    }

    pub fn reset_defaults(&mut self) {
        for (v, f) in self.values.iter_mut().zip(self.schema.fields) {
            *v = f.default;
        }
    }

    pub fn is_editing(&self) -> bool {
        self.edit_buffer.is_some()
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.edit_buffer.as_deref()
    }

    pub fn begin_edit(&mut self) {
        self.edit_buffer = Some(String::new());
    }

    pub fn cancel_edit(&mut self) {
        self.edit_buffer = None;
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(buf) = &mut self.edit_buffer
            && (c.is_ascii_digit() || c == '.' || c == '-')
        {
            buf.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(buf) = &mut self.edit_buffer {
            buf.pop();
        }
    }

    pub fn commit_edit(&mut self) -> EditOutcome {
        let Some(buf) = self.edit_buffer.take() else {
            return EditOutcome::NotEditing;
        };
        let requested = match buf.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => return EditOutcome::Invalid(buf),
        };
        let f = &self.schema.fields[self.selected];
        let applied = f.clamp(requested);
        self.values[self.selected] = applied;
        if applied == requested {
            EditOutcome::Applied(applied)
        } else {
            EditOutcome::Clamped { requested, applied }
        }
    }

    /// The record handed to the pipeline on submit.
    pub fn to_record(&self) -> FeatureRecord {
        self.schema
            .fields
            .iter()
            .zip(&self.values)
            .map(|(f, &v)| (f.name, v))
            .collect()
    }
}

fn round_to_step(v: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return v;
    }
    (v / step).round() * step
}
