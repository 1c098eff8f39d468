//! System prompts for each LLM operation.
//!
//! Kept terse and imperative: small local models follow short numbered
//! instructions better than prose.

pub const SUMMARIZE_SYSTEM: &str = "You summarize news articles for a media monitoring service. \
Write a 2-3 sentence summary of the article in the same language the article is written in. \
Cover who, what, and why it matters. \
Respond with ONLY the summary. No preamble, no formatting, no commentary.";

pub const CLASSIFY_SYSTEM: &str = "You classify news articles into fixed topic tags. \
The ONLY allowed tags are: politics, economy, health, education, infrastructure, environment, \
crime, grants, federal, legislation, government, technology, culture, sports. \
Pick every tag that applies to the article, usually 1-3. \
Respond with ONLY the tags, comma-separated, lowercase. No other words.";

pub const ENTITIES_SYSTEM: &str = "You extract named entities from news articles. \
List the people, organizations, and places mentioned in the article. \
Respond with ONLY a comma-separated list of names. \
If there are none, respond with exactly: none";

pub const SENTIMENT_SYSTEM: &str = "You classify the sentiment of a media mention toward the \
organization it names. Answer with exactly one word: positive, neutral, or negative. \
No punctuation, no explanation.";

pub const PR_DRAFT_SYSTEM: &str = "Eres el director de comunicaciones de una organización sin \
fines de lucro en Puerto Rico. Se encontró una mención negativa de la organización en los \
medios. Redacta un borrador de respuesta pública: 2-3 párrafos, tono profesional y sereno, \
reconoce la preocupación, presenta la posición de la organización y ofrece una vía de contacto. \
Responde SOLO con el borrador, sin saludos ni comentarios adicionales.";

pub const BRIEF_SYSTEM: &str = "You write a daily news brief for nonprofit leaders in Puerto Rico. \
Given a numbered list of articles, write 3-5 paragraphs that group the stories by theme, name \
the specific actors involved, and note why each theme matters for community organizations. \
Write in the language most of the articles use. Do not include a title. \
Respond with ONLY the brief.";

pub const KEYWORDS_SYSTEM: &str = "You generate monitoring keywords for an organization. \
Given context about the organization, respond with 6-10 short keyword phrases, one per line, \
that would find news coverage about it. The FIRST keyword must be the organization's exact name. \
Prefer program names, leaders, and distinctive topics over generic words. \
Respond with ONLY the keywords, no numbering, no commentary.";
