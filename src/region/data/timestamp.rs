use bitfield::bitfield;
#[cfg(feature = "chrono")]
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use derive_more::{From, Into};

bitfield! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, From, Into)]
    pub struct Date(u16);
    year_offset, set_year_offset: 15, 9;
    pub month, set_month: 8, 5;
    pub day, set_day: 4, 0;
}

impl Date {
    pub fn year(&self) -> u16 {
        self.year_offset() + 1980
    }

    pub fn set_year(&mut self, year: u16) {
        self.set_year_offset(year.saturating_sub(1980))
    }
}

bitfield! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, From, Into)]
    pub struct Time(u16);
    pub hour, set_hour: 15, 11;
    pub minute, set_minute: 10, 5;
    double_second, set_double_second: 4, 0;
}

impl Time {
    pub fn second(&self) -> u16 {
        self.double_second() * 2
    }

    pub fn set_second(&mut self, second: u16) {
        self.set_double_second(second / 2)
    }
}

/// Date and time pair, `centiseconds` only recorded for creation
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub date: Date,
    pub time: Time,
    pub centiseconds: u8,
}

#[cfg(feature = "chrono")]
impl Timestamp {
    /// None for unset or out of range fields
    pub fn to_chrono(&self) -> Option<NaiveDateTime> {
        let date = &self.date;
        let date = NaiveDate::from_ymd_opt(date.year() as i32, date.month() as u32, date.day() as u32)?;
        let (hour, minute, second) = (self.time.hour(), self.time.minute(), self.time.second());
        let millis = (self.centiseconds as u32 % 100) * 10;
        let extra = (self.centiseconds as u32 / 100) as u16;
        let time = NaiveTime::from_hms_milli_opt(
            hour as u32,
            minute as u32,
            (second + extra) as u32,
            millis,
        )?;
        Some(NaiveDateTime::new(date, time))
    }
}

#[cfg(feature = "chrono")]
impl From<NaiveDateTime> for Timestamp {
    fn from(datetime: NaiveDateTime) -> Self {
        let mut date = Date::default();
        date.set_year(datetime.year() as u16);
        date.set_month(datetime.month() as u16);
        date.set_day(datetime.day() as u16);
        let mut time = Time::default();
        time.set_hour(datetime.hour() as u16);
        time.set_minute(datetime.minute() as u16);
        time.set_second(datetime.second() as u16);
        let odd = (datetime.second() % 2) * 100;
        // Leap seconds report nanoseconds past 1e9
        let nanosecond = datetime.nanosecond().min(999_999_999);
        let centiseconds = (odd + nanosecond / 10_000_000) as u8;
        Self { date, time, centiseconds }
    }
}
