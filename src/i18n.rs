use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Interface and prompt language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Zh,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// The other language, for the toggle button.
    pub fn toggled(&self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "zh" | "zh-cn" => Ok(Language::Zh),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

const EN: &[(&str, &str)] = &[
    ("appTitle", "ChemAI Pro"),
    ("navReaction", "Reaction Lab"),
    ("navBuilder", "Structure Builder"),
    ("reactionSetup", "Reaction Setup"),
    ("reactants", "Reactants"),
    ("conditions", "Conditions (Optional)"),
    ("placeholderReactants", "e.g. H2 + O2, Ethanol + Acetic Acid"),
    ("placeholderConditions", "Temperature, Catalyst..."),
    ("predictBtn", "Predict Reaction"),
    ("analyzingBtn", "Analyzing..."),
    ("mechanism", "Reaction Mechanism"),
    ("step", "Step"),
    ("reactionResult", "Reaction Result"),
    ("productsIdentified", "Products Identified"),
    ("geometry", "Geometry (VSEPR)"),
    ("productStructure", "3D Product Structure"),
    ("readyToSimulate", "Ready to Simulate"),
    ("enterReactants", "Enter reactants to visualize the chemical process"),
    ("tools", "Tools"),
    ("elements", "Elements"),
    ("instructionsTitle", "Instructions"),
    ("instructions.0", "Select an element and click on canvas to add atoms."),
    (
        "instructions.1",
        "Select \"Connect Bond\" tool, then click two atoms to link them. Click again to change bond order.",
    ),
    ("instructions.2", "Click \"Analyze Structure\" to get the IUPAC name."),
    ("canvasStats", "Canvas: {{atoms}} atoms, {{bonds}} bonds"),
    ("analyzeBtn", "Analyze Structure"),
    ("ruleLogic", "Rule Logic"),
    ("buildMoleculeInfo", "Build a molecule and click analyze to see IUPAC naming."),
    ("failedToAnalyze", "Failed to analyze reaction. Please check your API key and try again."),
    ("failedToName", "Could not name molecule. Try again."),
    ("toolsTooltip.move", "Select/Move"),
    ("toolsTooltip.bond", "Connect Bond"),
    ("toolsTooltip.delete", "Delete"),
    ("toolsTooltip.clear", "Clear All"),
    ("commonNameLabel", "Common Name"),
    ("systematicNameLabel", "Systematic Name"),
    ("previousStep", "Previous"),
    ("nextStep", "Next"),
    ("firstStep", "Restart"),
    ("play", "Play"),
    ("pause", "Pause"),
    ("fragments", "{{count}} fragment(s)"),
    ("languageName", "English"),
];

const ZH: &[(&str, &str)] = &[
    ("appTitle", "化学AI专家"),
    ("navReaction", "反应实验室"),
    ("navBuilder", "结构构建器"),
    ("reactionSetup", "反应设置"),
    ("reactants", "反应物"),
    ("conditions", "反应条件 (可选)"),
    ("placeholderReactants", "例如：H2 + O2, 乙醇 + 乙酸"),
    ("placeholderConditions", "温度, 催化剂..."),
    ("predictBtn", "预测反应"),
    ("analyzingBtn", "分析中..."),
    ("mechanism", "反应机理"),
    ("step", "步骤"),
    ("reactionResult", "反应结果"),
    ("productsIdentified", "生成的产物"),
    ("geometry", "分子几何构型 (VSEPR)"),
    ("productStructure", "3D 产物结构"),
    ("readyToSimulate", "准备模拟"),
    ("enterReactants", "输入反应物以可视化化学过程"),
    ("tools", "工具栏"),
    ("elements", "元素"),
    ("instructionsTitle", "使用说明"),
    ("instructions.0", "选择元素并在画布上点击以添加原子。"),
    ("instructions.1", "选择“连接键”工具，然后点击两个原子进行连接。再次点击可更改键级。"),
    ("instructions.2", "点击“分析结构”以获取 IUPAC 命名。"),
    ("canvasStats", "画布: {{atoms}} 原子, {{bonds}} 键"),
    ("analyzeBtn", "分析结构"),
    ("ruleLogic", "命名规则"),
    ("buildMoleculeInfo", "构建分子并点击分析以查看 IUPAC 命名。"),
    ("failedToAnalyze", "分析反应失败。请检查您的 API 密钥并重试。"),
    ("failedToName", "无法命名分子。请重试。"),
    ("toolsTooltip.move", "选择/移动"),
    ("toolsTooltip.bond", "连接键"),
    ("toolsTooltip.delete", "删除"),
    ("toolsTooltip.clear", "清空全部"),
    ("commonNameLabel", "俗名"),
    ("systematicNameLabel", "系统命名"),
    ("previousStep", "上一步"),
    ("nextStep", "下一步"),
    ("firstStep", "重新开始"),
    ("play", "播放"),
    ("pause", "暂停"),
    ("fragments", "{{count}} 个片段"),
    ("languageName", "中文"),
];

lazy_static! {
    static ref TRANSLATIONS: HashMap<Language, HashMap<&'static str, &'static str>> = {
        let mut table = HashMap::new();
        table.insert(Language::En, EN.iter().copied().collect());
        table.insert(Language::Zh, ZH.iter().copied().collect());
        table
    };
}

/// Look up a UI string. Unknown keys come back unchanged.
pub fn tr<'a>(lang: Language, key: &'a str) -> &'a str {
    lookup(lang, key).unwrap_or(key)
}

fn lookup(lang: Language, key: &str) -> Option<&'static str> {
    TRANSLATIONS.get(&lang).and_then(|table| table.get(key)).copied()
}

/// Look up a UI string and substitute `{{name}}` placeholders.
pub fn tr_with(lang: Language, key: &str, params: &[(&str, String)]) -> String {
    let mut text = tr(lang, key).to_string();
    for (name, value) in params {
        text = text.replace(&format!("{{{{{name}}}}}"), value);
    }
    text
}

/// The numbered instruction lines shown beside the builder canvas.
pub fn instructions(lang: Language) -> Vec<&'static str> {
    (0..)
        .map_while(|i| {
            let key = format!("instructions.{i}");
            lookup(lang, &key)
        })
        .collect()
}
