use rhai::EvalAltResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Script-level error: thrown value, bad types, missing variables.
    Recoverable,
    /// The interpreter itself gave up: stack or resource limits, aborts.
    Unrecoverable,
}

/// Outcome of a protected call that did not return normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub event: String,
    pub class: FailureClass,
    pub message: String,
}

impl CallFailure {
    pub fn from_eval(event: &str, error: &EvalAltResult) -> Self {
        Self {
            event: event.to_string(),
            class: classify(error),
            message: error.to_string(),
        }
    }

    pub fn is_unrecoverable(&self) -> bool {
        self.class == FailureClass::Unrecoverable
    }
}

pub fn classify(error: &EvalAltResult) -> FailureClass {
    match error {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => classify(inner),
        EvalAltResult::ErrorStackOverflow(_)
        | EvalAltResult::ErrorTooManyOperations(_)
        | EvalAltResult::ErrorTooManyVariables(_)
        | EvalAltResult::ErrorTooManyModules(_)
        | EvalAltResult::ErrorDataTooLarge(_, _)
        | EvalAltResult::ErrorTerminated(_, _)
        | EvalAltResult::ErrorDataRace(_, _)
        | EvalAltResult::ErrorSystem(_, _) => FailureClass::Unrecoverable,
        _ => FailureClass::Recoverable,
    }
}
