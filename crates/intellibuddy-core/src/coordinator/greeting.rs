use chrono::Timelike;

use crate::session::TimeOfDay;

pub fn time_of_day(hour: u32) -> TimeOfDay {
    match hour {
        5..=11 => TimeOfDay::Morning,
        12..=16 => TimeOfDay::Afternoon,
        17..=18 => TimeOfDay::Evening,
        _ => TimeOfDay::Night,
    }
}

pub fn time_based_greeting(hour: u32) -> &'static str {
    match time_of_day(hour) {
        TimeOfDay::Morning => "Good morning!",
        TimeOfDay::Afternoon => "Good afternoon!",
        TimeOfDay::Evening => "Good evening!",
        TimeOfDay::Night => "Good night!",
    }
}

/// The opening message: time-based salutation plus either a welcome-back for
/// a known user or the name question for a new one. "Good night!" reads
/// oddly as a salutation, so the night variant skips it.
pub fn full_greeting(user_name: Option<&str>, hour: u32) -> String {
    let salutation = time_based_greeting(hour);
    let is_night = matches!(time_of_day(hour), TimeOfDay::Night);

    if let Some(name) = user_name {
        return if is_night {
            format!("Welcome back, {name}. How can I help you today?")
        } else {
            format!("{salutation} Welcome back, {name}. How can I help you today?")
        };
    }

    let body = "I'm IntelliBuddy. What's your name and how can I help you today?\n\n\
                Tip: You can select your preferred language from the top before starting to chat!";
    if is_night {
        body.to_string()
    } else {
        format!("{salutation} {body}")
    }
}

pub fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_map_to_day_parts() {
        assert_eq!(time_of_day(6), TimeOfDay::Morning);
        assert_eq!(time_of_day(13), TimeOfDay::Afternoon);
        assert_eq!(time_of_day(17), TimeOfDay::Evening);
        assert_eq!(time_of_day(22), TimeOfDay::Night);
        assert_eq!(time_of_day(3), TimeOfDay::Night);
    }

    #[test]
    fn night_greeting_skips_the_salutation() {
        let morning = full_greeting(None, 9);
        assert!(morning.starts_with("Good morning!"));

        let night = full_greeting(None, 23);
        assert!(night.starts_with("I'm IntelliBuddy"));

        let returning = full_greeting(Some("Sam"), 9);
        assert!(returning.contains("Welcome back, Sam"));
    }
}
