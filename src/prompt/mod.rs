//! Prompt templates
//!
//! Each template is a pure function of its [`PromptContext`]; the pipeline
//! decides which one applies.

use crate::power::{PowerRelation, Tone};
use crate::profile::{Gender, PersonalityView, personality_view};

pub mod rules;

/// The active persona as seen by a template
#[derive(Debug, Clone)]
pub struct PersonaBrief {
    pub name: String,
    /// Summary without image links
    pub summary: String,
    pub gender: Option<Gender>,
    pub personality: Option<String>,
}

impl PersonaBrief {
    fn view(&self, view: PersonalityView) -> Option<String> {
        self.personality
            .as_deref()
            .map(|p| personality_view(p, view))
            .filter(|p| !p.is_empty())
    }

    fn header(&self, view: PersonalityView) -> String {
        let mut header = format!("你是 {}。\n{}\n", self.name, Gender::instruction(self.gender));
        match (view, self.view(view)) {
            (PersonalityView::SelfView, Some(text)) => {
                header.push_str(&format!("你對自己的認知：{}\n", text));
            }
            (PersonalityView::OthersView, Some(text)) => {
                header.push_str(&format!("旁人眼中的你：{}\n", text));
            }
            (_, None) => {}
        }
        header.push_str(rules::STAY_IN_CHARACTER);
        header.push('\n');
        header
    }
}

/// A non-persona entity resolved for this request
#[derive(Debug, Clone)]
pub struct EntityBrief {
    pub name: String,
    /// Summary including the image-link block
    pub summary: String,
    pub relation: PowerRelation,
    pub tone: Tone,
}

impl EntityBrief {
    fn section(&self) -> String {
        format!(
            "【{}】\n{}\n戰力關係：\n{}\n語氣：{}\n",
            self.name,
            self.summary.trim_end(),
            self.relation.line(&self.name),
            self.tone.instruction(&self.name)
        )
    }
}

/// Inputs assembled for one request
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub query: &'a str,
    pub persona: PersonaBrief,
    pub entities: Vec<EntityBrief>,
    pub include_self: bool,
}

/// One people-search match with its profile summary
#[derive(Debug, Clone)]
pub struct SearchBrief {
    pub name: String,
    pub similarity: f32,
    pub total_power: Option<i64>,
    pub summary: String,
}

fn footer(query: &str) -> String {
    format!("{}\n\n問題：{}\n回答：", rules::ANSWER_LANGUAGE, query)
}

/// First-person self introduction, never with images
pub fn identity(ctx: &PromptContext<'_>) -> String {
    format!(
        "{header}\n你的資料：\n{summary}\n\n規則：\n- {only}\n- {no_images}\n- 以第一人稱介紹自己，回答問題問到的部分。\n\n{footer}",
        header = ctx.persona.header(PersonalityView::SelfView),
        summary = ctx.persona.summary.trim_end(),
        only = rules::ONLY_GIVEN_DATA,
        no_images = rules::NO_IMAGES,
        footer = footer(ctx.query),
    )
}

/// One other entity and no persona: brief comment, cited data, image block last
pub fn single_character(ctx: &PromptContext<'_>) -> String {
    let sections: String = ctx.entities.iter().map(EntityBrief::section).collect();
    format!(
        "{header}\n有人問你關於另一個角色的問題。\n\n角色資料：\n{sections}\n規則：\n- {only}\n- 先用一兩句話依照語氣評論這個角色，再引用資料回答問題。\n- 回答最後附上該角色的圖片連結。\n- {keep}\n\n{footer}",
        header = ctx.persona.header(PersonalityView::OthersView),
        only = rules::ONLY_GIVEN_DATA,
        keep = rules::KEEP_IMAGE_BLOCK,
        footer = footer(ctx.query),
    )
}

/// Persona plus exactly one other entity
pub fn self_and_other(ctx: &PromptContext<'_>) -> String {
    let sections: String = ctx.entities.iter().map(EntityBrief::section).collect();
    format!(
        "{header}\n你的資料：\n{summary}\n\n另一個角色的資料：\n{sections}\n規則：\n- {only}\n- 先以第一人稱簡短介紹自己。\n- {no_self}\n- 接著依照語氣評論另一個角色，並附上該角色的圖片連結。\n- {keep}\n- {pronouns}\n\n{footer}",
        header = ctx.persona.header(PersonalityView::OthersView),
        summary = ctx.persona.summary.trim_end(),
        only = rules::ONLY_GIVEN_DATA,
        no_self = rules::NO_SELF_IMAGES,
        keep = rules::KEEP_IMAGE_BLOCK,
        pronouns = rules::PRONOUNS,
        footer = footer(ctx.query),
    )
}

/// Two or more other entities, one paragraph each
pub fn multi_character(ctx: &PromptContext<'_>) -> String {
    let sections: String = ctx.entities.iter().map(EntityBrief::section).collect();
    let order: Vec<&str> = ctx.entities.iter().map(|e| e.name.as_str()).collect();

    let self_part = if ctx.include_self {
        format!(
            "你的資料：\n{}\n\n",
            ctx.persona.summary.trim_end()
        )
    } else {
        String::new()
    };
    let self_rule = if ctx.include_self {
        format!("- 先以第一人稱簡短介紹自己，不加評論。\n- {}\n", rules::NO_SELF_IMAGES)
    } else {
        String::new()
    };

    format!(
        "{header}\n{self_part}角色資料：\n{sections}\n規則：\n- {only}\n{self_rule}- 依序為每個角色各寫一段：{order}。\n- 每段依照該角色的語氣評論，段落結束後緊接著附上該角色的圖片連結。\n- {keep}\n- {pronouns}\n\n{footer}",
        header = ctx.persona.header(PersonalityView::OthersView),
        order = order.join("、"),
        only = rules::ONLY_GIVEN_DATA,
        keep = rules::KEEP_IMAGE_BLOCK,
        pronouns = rules::PRONOUNS,
        footer = footer(ctx.query),
    )
}

/// Every named entity is missing
pub fn not_found(persona: &PersonaBrief, missing: &[String], query: &str) -> String {
    format!(
        "{header}\n問題中提到的人：{missing}\n\n規則：\n- {not_found}\n- {no_images}\n\n{footer}",
        header = persona.header(PersonalityView::SelfView),
        missing = missing.join("、"),
        not_found = rules::NOT_FOUND,
        no_images = rules::NO_IMAGES,
        footer = footer(query),
    )
}

/// Results from the people-embedding index
pub fn people_search(persona: &PersonaBrief, hits: &[SearchBrief], query: &str) -> String {
    let results: String = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let power = hit
                .total_power
                .map(|p| format!("，總戰力 {}", p))
                .unwrap_or_default();
            format!(
                "{}. {}（相似度 {:.2}{}）\n{}\n\n",
                i + 1,
                hit.name,
                hit.similarity,
                power,
                hit.summary.trim_end()
            )
        })
        .collect();

    format!(
        "{header}\n搜尋結果：\n{results}規則：\n- {search}\n- {only}\n- {keep}\n\n{footer}",
        header = persona.header(PersonalityView::OthersView),
        search = rules::SEARCH_RESULTS,
        only = rules::ONLY_GIVEN_DATA,
        keep = rules::KEEP_IMAGE_BLOCK,
        footer = footer(query),
    )
}

/// Persona-free document question answering
pub fn generic_qa(context: &str, query: &str) -> String {
    let context = if context.trim().is_empty() { "（沒有提供資料）" } else { context };
    format!("{}\n\n資料：\n{}\n\n{}", rules::GENERIC_QA, context, footer(query))
}
