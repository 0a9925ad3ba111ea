//! # Condition Updates
//!
//! Records the single Success/Failure condition of an Infra.

use crate::controller::reconciler::error::InfraError;
use crate::crd::{Infra, InfraCondition, InfraConditionType};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Mark the Infra as successfully bound
///
/// Reason and message are cleared. The transition time only moves when the
/// previous condition was not already Success.
pub fn set_success(infra: &mut Infra) {
    let status = infra.status.get_or_insert_with(Default::default);
    let previous = status.condition.take();
    let last_transition_time = match previous {
        Some(previous) if previous.r#type == InfraConditionType::Success => {
            previous.last_transition_time
        }
        _ => Some(now()),
    };
    status.condition = Some(InfraCondition {
        r#type: InfraConditionType::Success,
        status: "True".to_string(),
        reason: None,
        message: None,
        last_transition_time,
    });
}

/// Mark the Infra as failed with the classified reason of `error`
///
/// Nothing changes when the current condition is already a Failure with the
/// same message, so repeated identical failures do not churn the status.
pub fn set_failure(infra: &mut Infra, error: &InfraError) {
    let status = infra.status.get_or_insert_with(Default::default);
    let message = error.to_string();
    if let Some(current) = &status.condition {
        if current.r#type == InfraConditionType::Failure
            && current.message.as_deref() == Some(message.as_str())
        {
            return;
        }
    }
    status.condition = Some(InfraCondition {
        r#type: InfraConditionType::Failure,
        status: "False".to_string(),
        reason: Some(error.reason()),
        message: Some(message),
        last_transition_time: Some(now()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{InfraConditionReason, InfraSpec};

    fn infra() -> Infra {
        Infra::new("infra", InfraSpec::default())
    }

    fn not_ready() -> InfraError {
        InfraError::NotReady {
            kind: "Kafka".into(),
            name: "kogito-kafka".into(),
            namespace: "ns".into(),
            detail: "no Ready condition".into(),
        }
    }

    fn condition(infra: &Infra) -> &InfraCondition {
        infra.status.as_ref().unwrap().condition.as_ref().unwrap()
    }

    #[test]
    fn test_set_success_clears_reason_and_message() {
        let mut infra = infra();
        set_failure(&mut infra, &not_ready());
        set_success(&mut infra);

        let condition = condition(&infra);
        assert_eq!(condition.r#type, InfraConditionType::Success);
        assert_eq!(condition.status, "True");
        assert!(condition.reason.is_none());
        assert!(condition.message.is_none());
    }

    #[test]
    fn test_set_success_keeps_transition_time_when_already_successful() {
        let mut infra = infra();
        set_success(&mut infra);
        infra
            .status
            .as_mut()
            .unwrap()
            .condition
            .as_mut()
            .unwrap()
            .last_transition_time = Some("2024-01-01T00:00:00+00:00".into());

        set_success(&mut infra);
        assert_eq!(
            condition(&infra).last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_set_failure_records_reason_and_message() {
        let mut infra = infra();
        set_failure(&mut infra, &not_ready());

        let condition = condition(&infra);
        assert_eq!(condition.r#type, InfraConditionType::Failure);
        assert_eq!(condition.status, "False");
        assert_eq!(
            condition.reason,
            Some(InfraConditionReason::ResourceNotReady)
        );
        assert!(condition.message.as_ref().unwrap().contains("kogito-kafka"));
    }

    #[test]
    fn test_identical_failure_is_not_rewritten() {
        let mut infra = infra();
        set_failure(&mut infra, &not_ready());
        infra
            .status
            .as_mut()
            .unwrap()
            .condition
            .as_mut()
            .unwrap()
            .last_transition_time = Some("2024-01-01T00:00:00+00:00".into());

        set_failure(&mut infra, &not_ready());
        assert_eq!(
            condition(&infra).last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );

        let other = InfraError::MissingResourceConfig {
            kind: "MongoDBCommunity".into(),
            property: "username".into(),
        };
        set_failure(&mut infra, &other);
        assert_eq!(
            condition(&infra).reason,
            Some(InfraConditionReason::ResourceMissingResourceConfig)
        );
    }
}
