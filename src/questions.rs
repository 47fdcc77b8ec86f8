use std::fmt;

use crate::pacing::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Crypto,
    Tech,
    Philosophical,
    Personal,
    Casual,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crypto => "crypto",
            Self::Tech => "tech",
            Self::Philosophical => "philosophical",
            Self::Personal => "personal",
            Self::Casual => "casual",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub category: Category,
    pub question: &'static str,
}

/// Static prompt bank sampled one category at a time.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    entries: Vec<(Category, &'static [&'static str])>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self {
            entries: vec![
                (Category::Crypto, CRYPTO),
                (Category::Tech, TECH),
                (Category::Philosophical, PHILOSOPHICAL),
                (Category::Personal, PERSONAL),
                (Category::Casual, CASUAL),
            ],
        }
    }
}

impl QuestionBank {
    /// Picks a category uniformly, then a question within it.
    pub fn pick(&self, random: &mut dyn RandomSource) -> Prompt {
        let (category, questions) = self.entries[random.index(self.entries.len())];
        Prompt {
            category,
            question: questions[random.index(questions.len())],
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.iter().map(|(category, _)| *category)
    }
}

const CRYPTO: &[&str] = &[
    "What are the latest updates in Ethereum?",
    "How does proof of stake work?",
    "What are the best DeFi protocols?",
    "Explain smart contract security",
    "What's your opinion on layer 2 solutions?",
    "How do you see blockchain evolving in the next decade?",
    "What's the most innovative crypto project you've seen recently?",
];

const TECH: &[&str] = &[
    "How does AI work?",
    "What's your favorite programming language?",
    "What are the most promising technologies right now?",
    "How important is cybersecurity?",
    "Are quantum computers going to change everything?",
    "What's your view on automation and its impact on jobs?",
];

const PHILOSOPHICAL: &[&str] = &[
    "What is the meaning of life?",
    "How do you define happiness?",
    "Is free will an illusion?",
    "What makes something ethical or unethical?",
    "How important is truth in a society?",
];

const PERSONAL: &[&str] = &[
    "What are some good self-improvement strategies?",
    "How do you stay motivated?",
    "What are effective ways to manage stress?",
    "How important is work-life balance?",
    "What habits lead to success in your opinion?",
];

const CASUAL: &[&str] = &[
    "If you could travel anywhere, where would you go?",
    "What's your favorite food?",
    "What hobbies do you recommend trying?",
    "What books would you recommend?",
    "How do you like to spend your weekends?",
];
