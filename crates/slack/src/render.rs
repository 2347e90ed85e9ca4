//! Result rendering: result sets in, ordered block lists out.

use scout_core::config::{FacetField, PictureField, SearchConfig};
use scout_core::facets::FacetSelection;
use scout_core::highlight::apply_highlights;
use scout_search::types::{FacetOutput, ResultSet, SearchResult};

use crate::blocks::{
    Accessory, Block, ButtonElement, DispatchActionConfig, InputElement, MessageTemplate,
    OptionGroup, SelectOption, TextObject,
};

pub const HOME_SEARCH_ACTION_ID: &str = "home_tab_search_enter";
pub const MODAL_SEARCH_ACTION_ID: &str = "modal_search_enter";
pub const FACET_ACTION_ID: &str = "facet_input";
pub const OPEN_DOCUMENT_ACTION_ID: &str = "open_document";
pub const ATTACH_ACTION_ID: &str = "attach_to_message";

pub const SEARCH_INPUT_BLOCK_ID: &str = "search_input";
pub const FACET_BLOCK_ID: &str = "facet_section";

/// Everything the renderer needs from deployment configuration.
#[derive(Clone, Debug, Default)]
pub struct RenderConfig {
    pub facet_fields: Vec<FacetField>,
    pub display_fields: Vec<FacetField>,
    pub picture_fields: Vec<PictureField>,
    pub full_search_page_url: String,
    pub open_redirect_url: String,
}

impl From<&SearchConfig> for RenderConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            facet_fields: config.facet_fields.clone(),
            display_fields: config.display_fields.clone(),
            picture_fields: config.picture_fields.clone(),
            full_search_page_url: config.full_search_page_url.clone(),
            open_redirect_url: config.open_redirect_url.clone(),
        }
    }
}

/// Per-surface rendering switches and the session identity that ends up in
/// click-tracking URLs.
#[derive(Clone, Debug, Default)]
pub struct ResultRenderOptions {
    pub add_attachment: bool,
    pub direct_message: bool,
    pub visitor_id: String,
    pub search_token: String,
    pub referrer: String,
    pub channel_context: String,
}

/// The tracking bundle behind every Open button. Opening a result goes
/// through a redirect-and-log hop, so the button value must carry everything
/// the open analytics event needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingParams {
    pub url: String,
    pub uri_hash: String,
    pub position: String,
    pub title: String,
    pub visitor: String,
    pub token: String,
    pub source: String,
    pub search_uid: String,
    pub referrer: String,
    pub channel: String,
}

impl TrackingParams {
    pub fn encode(&self, base: &str) -> String {
        format!(
            "{base}?url={}&urihash={}&position={}&title={}&visitor={}&token={}&source={}&searchUid={}&ref={}&ch={}",
            urlencoding::encode(&self.url),
            self.uri_hash,
            self.position,
            urlencoding::encode(&self.title),
            self.visitor,
            self.token,
            urlencoding::encode(&self.source),
            self.search_uid,
            urlencoding::encode(&self.referrer),
            urlencoding::encode(&self.channel),
        )
    }

    /// Tolerant query-string parse: unknown keys are ignored, missing keys
    /// decode to empty fields.
    pub fn decode(value: &str) -> Self {
        let mut params = Self::default();
        let query = value.split_once('?').map_or(value, |(_, query)| query);
        for pair in query.split('&') {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), Into::into);
            match key {
                "url" => params.url = decoded,
                "urihash" => params.uri_hash = decoded,
                "position" => params.position = decoded,
                "title" => params.title = decoded,
                "visitor" => params.visitor = decoded,
                "token" => params.token = decoded,
                "source" => params.source = decoded,
                "searchUid" => params.search_uid = decoded,
                "ref" => params.referrer = decoded,
                "ch" => params.channel = decoded,
                _ => {}
            }
        }
        params
    }
}

pub fn search_input_block(action_id: &str, query: &str) -> Block {
    Block::Input {
        block_id: SEARCH_INPUT_BLOCK_ID.to_owned(),
        dispatch_action: true,
        label: TextObject::plain("Search for:"),
        element: InputElement::PlainTextInput {
            action_id: action_id.to_owned(),
            placeholder: TextObject::plain("What are you looking for?"),
            initial_value: query.to_owned(),
            dispatch_action_config: DispatchActionConfig::on_enter(),
        },
    }
}

/// Group the backend's facet values under the configured captions. Backend
/// facets for unconfigured fields are dropped; configured fields without
/// values contribute no group.
pub fn facet_option_groups(
    facet_fields: &[FacetField],
    facets: &[FacetOutput],
) -> Vec<OptionGroup> {
    facet_fields
        .iter()
        .filter_map(|field| {
            let output = facets.iter().find(|facet| facet.field == field.field)?;
            let options: Vec<SelectOption> = output
                .values
                .iter()
                .map(|value| SelectOption {
                    text: TextObject::plain(value.value.as_str()),
                    value: FacetSelection::option_value(&field.field, &value.value),
                })
                .collect();
            if options.is_empty() {
                None
            } else {
                Some(OptionGroup { label: TextObject::plain(field.caption.as_str()), options })
            }
        })
        .collect()
}

pub fn facet_section(option_groups: Vec<OptionGroup>) -> Block {
    Block::Section {
        block_id: Some(FACET_BLOCK_ID.to_owned()),
        text: TextObject::mrkdwn(":file_cabinet: Filters"),
        accessory: Some(Accessory::MultiStaticSelect {
            action_id: FACET_ACTION_ID.to_owned(),
            placeholder: TextObject::plain("Select items"),
            option_groups,
        }),
    }
}

/// The search box and, when the query produced facet values, the facet
/// picker under it.
pub fn starting_blocks(
    action_id: &str,
    query: &str,
    facet_fields: &[FacetField],
    facets: &[FacetOutput],
) -> Vec<Block> {
    let mut blocks = vec![search_input_block(action_id, query)];
    let groups = facet_option_groups(facet_fields, facets);
    if !groups.is_empty() {
        blocks.push(facet_section(groups));
    }
    blocks
}

/// Header and context pair for the compact chat reply.
pub fn chat_header_blocks(
    user_name: &str,
    query: &str,
    page_size: u32,
    full_search_page_url: &str,
) -> Vec<Block> {
    vec![
        Block::header("Scout Search Results"),
        Block::context(vec![
            TextObject::mrkdwn(format!(
                "Hey {user_name}! Here are the {page_size} top results for your query: *{query}*"
            )),
            TextObject::mrkdwn(format!(
                "<{full_search_page_url}#q={}|Open the full search page>",
                urlencoding::encode(query)
            )),
        ]),
    ]
}

pub fn count_block(returned: usize, total: u64) -> Option<Block> {
    (returned > 0).then(|| {
        Block::context(vec![TextObject::mrkdwn(format!("Result 1-{returned} of {total}"))])
    })
}

pub fn no_results_block() -> Block {
    Block::section(TextObject::mrkdwn("Sorry, no results"))
}

/// Blocks for one page of results, in ranking order.
pub fn result_blocks(
    config: &RenderConfig,
    results: &ResultSet,
    options: &ResultRenderOptions,
) -> Vec<Block> {
    let mut blocks = Vec::new();

    for (index, result) in results.results.iter().enumerate() {
        let title = apply_highlights(&result.title, &result.title_highlights);
        let excerpt = apply_highlights(&result.excerpt, &result.excerpt_highlights);
        let image_url = picture_url(&config.picture_fields, result);

        let tracking = TrackingParams {
            url: result.click_uri.clone(),
            uri_hash: result.raw_text("urihash").unwrap_or_default(),
            position: (index + 1).to_string(),
            title: result.title.clone(),
            visitor: options.visitor_id.clone(),
            token: options.search_token.clone(),
            source: result.raw_text("source").unwrap_or_default(),
            search_uid: results.search_uid.clone(),
            referrer: options.referrer.clone(),
            channel: options.channel_context.clone(),
        };
        let tracking_value = tracking.encode(&config.open_redirect_url);

        blocks.push(match &image_url {
            Some(image_url) => Block::Section {
                block_id: None,
                text: TextObject::mrkdwn(format!(":page_facing_up: {title}\n{excerpt}")),
                accessory: Some(Accessory::Image {
                    image_url: image_url.clone(),
                    alt_text: result.title.clone(),
                }),
            },
            None => Block::section(TextObject::mrkdwn(format!(":page_facing_up: {title}"))),
        });

        let mut buttons = vec![ButtonElement::new(OPEN_DOCUMENT_ACTION_ID, ":link: Open")
            .value(tracking_value.clone())
            .url(result.click_uri.clone())];
        if options.add_attachment && !options.direct_message {
            buttons
                .push(ButtonElement::new(ATTACH_ACTION_ID, "Attach to message").value(tracking_value));
        }
        blocks.push(Block::actions(buttons));

        if !excerpt.is_empty() && image_url.is_none() {
            blocks.push(Block::section(TextObject::mrkdwn(excerpt)));
        }

        let display_lines: Vec<TextObject> = config
            .display_fields
            .iter()
            .filter_map(|field| {
                result
                    .raw_text(&field.field)
                    .map(|value| TextObject::plain(format!("{}: {}", field.caption, value)))
            })
            .collect();
        if !display_lines.is_empty() {
            blocks.push(Block::context(display_lines));
        }

        blocks.push(Block::Divider);
    }

    blocks
}

/// The full search surface: input, facets, then the count line and results,
/// or the lone no-results section.
pub fn search_view_blocks(
    config: &RenderConfig,
    action_id: &str,
    query: &str,
    results: &ResultSet,
    options: &ResultRenderOptions,
) -> Vec<Block> {
    let mut blocks = starting_blocks(action_id, query, &config.facet_fields, &results.facets);
    if results.total_count > 0 {
        if let Some(count) = count_block(results.results.len(), results.total_count) {
            blocks.push(count);
        }
        blocks.extend(result_blocks(config, results, options));
    } else {
        blocks.push(no_results_block());
    }
    blocks
}

/// Message posted back into the source conversation by attach-to-message.
pub fn attachment_message(title: &str, tracking_value: &str, url: &str) -> MessageTemplate {
    MessageTemplate {
        fallback_text: format!(":page_facing_up: {title}"),
        blocks: vec![
            Block::section(TextObject::mrkdwn(format!(":page_facing_up: {title}"))),
            Block::actions(vec![ButtonElement::new(OPEN_DOCUMENT_ACTION_ID, ":link: Open")
                .value(tracking_value)
                .url(url)]),
        ],
    }
}

fn picture_url(picture_fields: &[PictureField], result: &SearchResult) -> Option<String> {
    picture_fields.iter().find_map(|picture| {
        let value = result.raw_text(&picture.field)?;
        result.raw_text(&picture.srcfield)?;
        Some(format!("{}{}", picture.prefix, value))
    })
}
