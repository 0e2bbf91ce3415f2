//! Profile summary rendering
//!
//! A summary is a fixed multi-line template over the profile record's
//! attributes, optionally followed by the entity's four image links.

use crate::services::ProfileRecord;

/// Heading that introduces an image-link block
pub const IMAGE_LINKS_HEADING: &str = "圖片連結：";

const SELF_VIEW_MARKER: &str = "自己對自己的認知";
const OTHERS_VIEW_MARKER: &str = "她人對自己的認知";

/// The four fixed-pattern image URLs for one entity
pub fn image_urls(base: &str, name: &str) -> [String; 4] {
    let base = base.trim_end_matches('/');
    [
        format!("{}/{}.png", base, name),
        format!("{}/{}Fighting.png", base, name),
        format!("{}/{}Ruined.png", base, name),
        format!("{}/Ravishing{}.png", base, name),
    ]
}

/// Heading plus the four URLs, one per line
pub fn image_block(base: &str, name: &str) -> String {
    let mut block = String::from(IMAGE_LINKS_HEADING);
    for url in image_urls(base, name) {
        block.push('\n');
        block.push_str(&url);
    }
    block
}

/// Render a profile record into its summary text
pub fn render(record: &ProfileRecord, name: &str, image_base: Option<&str>) -> String {
    let f = |key: &str| record.field(key);
    let display_name = format!(
        "{}（{}）",
        record.get("nameOriginal").unwrap_or_else(|| name.to_string()),
        record.name().unwrap_or_else(|| name.to_string())
    );

    let mut summary = format!(
        "{display_name}的個人資料：
- 編號：{id}
- 原名：{name_original}
- 代號：{code_name}
- 戰鬥力：物理{physic}、魔法{magic}、武器{utility}
- 出生：{dob}
- 種族：{race}
- 屬性：{attributes}
- 性別：{gender}
- 身材：胸部{bust}、臀部{hip}、身高{height}cm、體重{weight}kg
- 職業：{profession}
- 戰鬥風格：{combat}
- 最愛食物：{foods}
- 工作：{job}
- 體態：{physics}
- 別名：{known_as}
- 個性：{personality}
- 興趣：{interest}
- 喜歡：{likes}
- 討厭：{dislikes}
- 陣營：{faction}
- 部隊：{army}（編號{army_id}）
- 部門：{dept}（編號{dept_id}）
- 原部隊：{origin_army}（編號{origin_army_id}）
- 電子郵件：{email}
- 代理系統：{proxy}
",
        id = f("id"),
        name_original = f("nameOriginal"),
        code_name = f("codeName"),
        physic = f("physicPower"),
        magic = f("magicPower"),
        utility = f("utilityPower"),
        dob = f("dob"),
        race = f("race"),
        attributes = f("attributes"),
        gender = f("gender"),
        bust = f("boobsSize"),
        hip = f("assSize"),
        height = f("heightCm"),
        weight = f("weightKg"),
        profession = f("profession"),
        combat = f("combat"),
        foods = f("favoriteFoods"),
        job = f("job"),
        physics = f("physics"),
        known_as = f("knownAs"),
        personality = f("personality"),
        interest = f("interest"),
        likes = f("likes"),
        dislikes = f("dislikes"),
        faction = f("faction"),
        army = f("armyName"),
        army_id = f("armyId"),
        dept = f("deptName"),
        dept_id = f("deptId"),
        origin_army = f("originArmyName"),
        origin_army_id = f("originArmyId"),
        email = f("email"),
        proxy = f("proxy"),
    );

    if let Some(base) = image_base {
        summary.push('\n');
        summary.push_str(&image_block(base, name));
        summary.push('\n');
    }

    summary
}

/// Placeholder used when the persona's own profile cannot be fetched
pub fn unavailable_placeholder(persona: &str) -> String {
    format!("{} 的個人資料：\n- 無法從 API 獲取最新資料，請檢查網路連接或 API 狀態\n", persona)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parse a profile gender attribute; anything ambiguous is `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let upper = raw.to_uppercase();
        if raw.starts_with('男') || upper.starts_with('M') {
            Some(Gender::Male)
        } else if raw.starts_with('女') || upper.starts_with('F') || upper.starts_with('W') {
            Some(Gender::Female)
        } else {
            None
        }
    }

    /// Gender of an entity, defaulting to female when absent or ambiguous
    pub fn of(record: Option<&ProfileRecord>) -> Self {
        record
            .and_then(|r| r.gender())
            .and_then(|g| Self::parse(&g))
            .unwrap_or(Gender::Female)
    }

    pub fn instruction(gender: Option<Self>) -> &'static str {
        match gender {
            Some(Gender::Male) => "你是男性，提到自己時使用男性的語氣與代詞。",
            Some(Gender::Female) => "你是女性，提到自己時使用女性的語氣與代詞。",
            None => "提到自己時保持一致的語氣與代詞。",
        }
    }
}

/// Which view of the persona's personality a template needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalityView {
    /// How the persona sees itself
    SelfView,
    /// How others see the persona
    OthersView,
}

/// Pick one view out of a `;`-separated personality text
///
/// Falls back to the whole text when the view markers are missing.
pub fn personality_view(personality: &str, view: PersonalityView) -> String {
    let marker = match view {
        PersonalityView::SelfView => SELF_VIEW_MARKER,
        PersonalityView::OthersView => OTHERS_VIEW_MARKER,
    };

    personality
        .split([';', '；'])
        .find(|part| part.contains(marker))
        .map(|part| {
            part.replace(marker, "")
                .trim_start_matches(['：', ':'])
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| personality.trim().to_string())
}
