use serde::Serialize;

/// Names of the sheets and columns the service reads and writes.
///
/// Defaults match the production spreadsheet; every name can be overridden
/// from the environment.
#[derive(Clone, Debug, Serialize)]
pub struct SheetLayout {
    pub attendance_sheet: String,
    pub staff_sheet: String,
    pub staging_sheet: String,

    pub employee_id: String,
    pub login_id: String,
    pub surname: String,
    pub given_name: String,
    pub role: String,
    pub first_approver: String,
    /// Column added to joined rows carrying the resolved first approver.
    pub approver: String,

    /// Primary sort key.
    pub attendance_deficit: String,
    /// Secondary sort key.
    pub clock_discrepancy: String,

    pub display_columns: Vec<String>,
    /// Duration columns of the imported timesheet.
    pub time_columns: Vec<String>,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            attendance_sheet: "勤怠確認シート(打刻管理)".into(),
            staff_sheet: "社員一覧".into(),
            staging_sheet: "貼り付け用".into(),

            employee_id: "社員番号".into(),
            login_id: "ログインID".into(),
            surname: "姓".into(),
            given_name: "名".into(),
            role: "権限".into(),
            first_approver: "第一承認者".into(),
            approver: "承認者".into(),

            attendance_deficit: "勤怠マイナス分".into(),
            clock_discrepancy: "打刻ズレ".into(),

            display_columns: [
                "社員番号",
                "名前",
                "休日出勤",
                "有休日数",
                "欠勤日数",
                "出勤時間",
                "総残業時間",
                "規定残業時間",
                "規定残業超過分",
                "深夜残業時間",
                "60時間超過残業",
                "打刻ズレ",
                "勤怠マイナス分",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            time_columns: [
                "所定内勤務時間",
                "所定時間外勤務時間",
                "所定外休日勤務時間",
                "法定外休日勤務時間",
                "法定休日勤務時間",
                "深夜勤務時間",
                "勤務時間",
                "実勤務時間",
                "確定_有給なし_残業時間",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
