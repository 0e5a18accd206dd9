// Per-language strings for countdowns, congestion labels and view chrome
use crate::nta_models::Lang;

pub struct Locale {
    /// Shown instead of a countdown while a train is at the platform
    pub now: &'static str,
    pub minute_unit: &'static str,
    pub second_unit: &'static str,
    /// `{}` is replaced by the countdown body
    pub future_marker: &'static str,
    pub past_marker: &'static str,
    pub congestion_labels: [&'static str; 4],
    pub no_congestion_data: &'static str,
    pub no_trains: &'static str,
    pub previous_station: &'static str,
    pub loading: &'static str,
    pub stale_data: &'static str,
}

const KO: Locale = Locale {
    now: "곧 도착",
    minute_unit: "분 ",
    second_unit: "초",
    future_marker: "{} 후",
    past_marker: "{} 전",
    congestion_labels: ["여유", "보통", "주의", "혼잡"],
    no_congestion_data: "이 노선은 혼잡도 정보를 제공하지 않습니다",
    no_trains: "도착 예정 열차가 없습니다",
    previous_station: "이전역",
    loading: "불러오는 중",
    stale_data: "최신 정보를 가져오지 못했습니다",
};

const EN: Locale = Locale {
    now: "Now",
    minute_unit: "m ",
    second_unit: "s",
    future_marker: "in {}",
    past_marker: "{} ago",
    congestion_labels: ["Relaxed", "Normal", "Busy", "Crowded"],
    no_congestion_data: "No congestion data for this line",
    no_trains: "No upcoming trains",
    previous_station: "from",
    loading: "Loading",
    stale_data: "Could not refresh",
};

const JA: Locale = Locale {
    now: "まもなく",
    minute_unit: "分",
    second_unit: "秒",
    future_marker: "{}後",
    past_marker: "{}前",
    congestion_labels: ["空いている", "普通", "やや混雑", "混雑"],
    no_congestion_data: "この路線の混雑度データはありません",
    no_trains: "到着予定の列車はありません",
    previous_station: "前の駅",
    loading: "読み込み中",
    stale_data: "更新できませんでした",
};

const ZH: Locale = Locale {
    now: "即将到达",
    minute_unit: "分",
    second_unit: "秒",
    future_marker: "{}后",
    past_marker: "{}前",
    congestion_labels: ["宽松", "普通", "较拥挤", "拥挤"],
    no_congestion_data: "该线路没有拥挤度数据",
    no_trains: "没有即将到达的列车",
    previous_station: "上一站",
    loading: "加载中",
    stale_data: "无法刷新",
};

impl Locale {
    pub fn of(lang: Lang) -> &'static Locale {
        match lang {
            Lang::Ko => &KO,
            Lang::En => &EN,
            Lang::Ja => &JA,
            Lang::Zh => &ZH,
        }
    }

    /// Label for a congestion level; levels above the scale clamp to the last label.
    pub fn congestion_label(&self, level: u8) -> &'static str {
        let index = usize::from(level).min(self.congestion_labels.len() - 1);
        self.congestion_labels[index]
    }

    pub fn future(&self, body: &str) -> String {
        self.future_marker.replacen("{}", body, 1)
    }

    pub fn past(&self, body: &str) -> String {
        self.past_marker.replacen("{}", body, 1)
    }
}
