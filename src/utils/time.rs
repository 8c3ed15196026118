use chrono::{DateTime, Local, NaiveDate, Utc};

/// This is the standard way of converting a date to a string in focus-tracker. The same
/// format is used as the `usage_date` column value.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Usage is accounted per local calendar day.
pub fn usage_day(moment: DateTime<Utc>) -> NaiveDate {
    moment.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::date_to_key;

    #[test]
    fn date_key_is_iso() {
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        assert_eq!(date_to_key(date), "2018-07-04");
    }
}
