use chrono::{DateTime, Utc};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::AdministrationDetailType,
};

pub fn validate_period(start_date: DateTime<Utc>, end_date: Option<DateTime<Utc>>) -> Result<(), ApplicationError> {
    match end_date {
        Some(end_date) if end_date < start_date => Err(ApplicationError::new(ErrorType::Validation, "End date cannot be before start date".to_string())),
        _ => Ok(()),
    }
}

/**
 * When a head starting at `start_date` takes over from the other heads: its start, or `now` when
 * that already passed.
 */
pub fn takeover_date(start_date: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    start_date.max(now)
}

/**
 * The heads a new head period replaces. `running` holds the heads still running at the takeover
 * date; those starting after the new period has ended are kept.
 */
pub fn replaced_heads(running: &[AdministrationDetailType], except_id: Option<i64>, end_date: Option<DateTime<Utc>>) -> Vec<AdministrationDetailType> {
    running
        .iter()
        .filter(|head| Some(head.id) != except_id)
        .filter(|head| end_date.is_none_or(|end_date| head.start_date < end_date))
        .cloned()
        .collect()
}

/**
 * The end date for closing an administration at `at`, never before its start.
 *
 * # Returns
 * `None` when the administration has already ended by then.
 */
pub fn closing_date(administration: &AdministrationDetailType, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match administration.end_date {
        Some(end_date) if end_date <= at => None,
        _ => Some(at.max(administration.start_date)),
    }
}

/**
 * Whether a period ending at `end_date` still runs after `now`.
 */
pub fn runs_after(end_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    end_date.is_none_or(|end_date| end_date > now)
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;
    use crate::model::models::{ADMIN_TYPE_CLUB_HEAD, AdminType};

    fn head(id: i64, start_date: DateTime<Utc>, end_date: Option<DateTime<Utc>>) -> AdministrationDetailType {
        AdministrationDetailType {
            id,
            user_id: format!("user-{id}"),
            user_name: "Test User".to_string(),
            owner_id: 1,
            admin_type: AdminType { id: 1, name: ADMIN_TYPE_CLUB_HEAD.to_string() },
            start_date,
            end_date,
        }
    }

    #[test]
    fn test_validate_period() {
        let now = Utc::now();
        assert!(validate_period(now, None).is_ok());
        assert!(validate_period(now, Some(now)).is_ok());
        assert_eq!(validate_period(now, Some(now - Duration::days(1))).unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_takeover_date() {
        let now = Utc::now();
        assert_eq!(takeover_date(now - Duration::days(3), now), now);
        assert_eq!(takeover_date(now + Duration::days(3), now), now + Duration::days(3));
    }

    #[test]
    fn test_replaced_heads_skips_self_and_later_heads() {
        let now = Utc::now();
        let running = vec![head(1, now - Duration::days(30), None), head(2, now, None), head(3, now + Duration::days(60), None)];
        let ids = |heads: Vec<AdministrationDetailType>| heads.iter().map(|head| head.id).collect::<Vec<_>>();
        assert_eq!(ids(replaced_heads(&running, None, None)), vec![1, 2, 3]);
        assert_eq!(ids(replaced_heads(&running, Some(2), None)), vec![1, 3]);
        assert_eq!(ids(replaced_heads(&running, Some(2), Some(now + Duration::days(30)))), vec![1]);
    }

    #[test]
    fn test_closing_date_never_before_start() {
        let now = Utc::now();
        assert_eq!(closing_date(&head(1, now - Duration::days(5), None), now), Some(now));
        let scheduled = head(2, now + Duration::days(10), None);
        assert_eq!(closing_date(&scheduled, now), Some(scheduled.start_date));
        assert_eq!(closing_date(&head(3, now - Duration::days(5), Some(now - Duration::days(1))), now), None);
        assert_eq!(closing_date(&head(4, now - Duration::days(5), Some(now + Duration::days(1))), now), Some(now));
    }

    #[test]
    fn test_runs_after() {
        let now = Utc::now();
        assert!(runs_after(None, now));
        assert!(runs_after(Some(now + Duration::days(1)), now));
        assert!(!runs_after(Some(now), now));
    }
}
