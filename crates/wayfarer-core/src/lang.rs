//! Supported-language table and localized canned strings.
//!
//! The router matches spoken language names against this table, and every
//! canned reply (trip plan, switch confirmation, failure notices, tips) is
//! looked up here by session language code. Unknown codes fall back to
//! English.

/// One supported conversation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// BCP 47 code, e.g. `hi-IN`.
    pub code: &'static str,
    /// English name the switch phrase matches against, e.g. `Hindi`.
    pub name: &'static str,
}

/// Languages the assistant can converse in.
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "en-US", name: "English" },
    Language { code: "hi-IN", name: "Hindi" },
    Language { code: "es-ES", name: "Spanish" },
    Language { code: "fr-FR", name: "French" },
    Language { code: "de-DE", name: "German" },
    Language { code: "ja-JP", name: "Japanese" },
    Language { code: "ta-IN", name: "Tamil" },
    Language { code: "ar-AE", name: "Arabic" },
];

/// Find a supported language by its English name, case-insensitively.
pub fn find_by_name(name: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
}

/// Find a supported language by its BCP 47 code.
pub fn find_by_code(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code == code)
}

/// Localized canned strings for one language.
#[derive(Debug, Clone, Copy)]
pub struct Strings {
    pub code: &'static str,
    /// Welcome greeting of a fresh session.
    pub welcome: &'static str,
    /// Quick-start chip labels. The trip-plan label doubles as the router's
    /// fixed shortcut phrase.
    pub trip_plan_label: &'static str,
    pub suggest_image_label: &'static str,
    pub suggest_phrases_label: &'static str,
    /// Canned static reply for the trip-plan shortcut.
    pub trip_plan_reply: &'static str,
    /// Confirmation appended after a successful language switch.
    pub switch_confirmation: &'static str,
    /// Generic failure notice when a stream or request dies.
    pub failure_notice: &'static str,
    /// Bot text offering the enumerated art styles.
    pub style_offer: &'static str,
    /// Image generation rejected by the safety system.
    pub image_safety: &'static str,
    /// Prefix for an explicit block reason (reason appended verbatim).
    pub image_blocked_prefix: &'static str,
    /// Image generation returned neither image nor text.
    pub image_empty: &'static str,
    /// Sustainability tips, one surfaced after every fifth user turn.
    pub tips: &'static [&'static str],
}

const EN: Strings = Strings {
    code: "en-US",
    welcome: "Hi! I'm your travel companion. Ask me anything, or try one of these:",
    trip_plan_label: "Plan a day trip",
    suggest_image_label: "Picture a destination",
    suggest_phrases_label: "Teach me local phrases",
    trip_plan_reply: "Here's a simple day-trip recipe: pick one neighbourhood, start with a local breakfast spot, walk to a viewpoint or market, take public transport to one museum or landmark, and finish with dinner booked a day ahead. Tell me the city and I'll fill in real places.",
    switch_confirmation: "Sure - let's continue in English.",
    failure_notice: "Sorry, something went wrong while answering. Please try again.",
    style_offer: "Nice idea! Which art style should I use?",
    image_safety: "I couldn't create that image because it was flagged by the safety system. Try rephrasing your request.",
    image_blocked_prefix: "The image request was blocked: ",
    image_empty: "The image service returned nothing usable. Please try again with a different prompt.",
    tips: &[
        "Tip: trains often beat short-haul flights on both time door-to-door and emissions.",
        "Tip: refill a bottle instead of buying water - most European tap water is excellent.",
        "Tip: staying longer in fewer places cuts transit emissions and usually costs less.",
    ],
};

const HI: Strings = Strings {
    code: "hi-IN",
    welcome: "नमस्ते! मैं आपका यात्रा साथी हूँ। कुछ भी पूछें, या इनमें से एक आज़माएँ:",
    trip_plan_label: "एक दिन की यात्रा की योजना",
    suggest_image_label: "किसी जगह की तस्वीर",
    suggest_phrases_label: "स्थानीय वाक्य सिखाएँ",
    trip_plan_reply: "एक आसान दिन-यात्रा योजना: एक मोहल्ला चुनें, स्थानीय नाश्ते से शुरुआत करें, किसी बाज़ार या दृश्य-स्थल तक पैदल जाएँ, सार्वजनिक परिवहन से एक स्मारक देखें, और पहले से बुक किए रात्रिभोज के साथ समाप्त करें। शहर बताइए, मैं असली जगहें भर दूँगा।",
    switch_confirmation: "ज़रूर - अब हम हिंदी में बात करेंगे।",
    failure_notice: "क्षमा करें, उत्तर देते समय कुछ गड़बड़ हो गई। कृपया फिर से प्रयास करें।",
    style_offer: "बढ़िया! किस कला-शैली में बनाऊँ?",
    image_safety: "यह चित्र नहीं बन सका क्योंकि सुरक्षा प्रणाली ने इसे रोक दिया। कृपया अनुरोध बदलकर देखें।",
    image_blocked_prefix: "चित्र अनुरोध अवरुद्ध: ",
    image_empty: "चित्र सेवा से कुछ उपयोगी नहीं मिला। कृपया अलग प्रॉम्प्ट आज़माएँ।",
    tips: &[
        "सुझाव: छोटी दूरी के लिए ट्रेन अक्सर उड़ान से तेज़ और कम प्रदूषणकारी होती है।",
        "सुझाव: पानी खरीदने के बजाय बोतल दोबारा भरें।",
    ],
};

const ES: Strings = Strings {
    code: "es-ES",
    welcome: "¡Hola! Soy tu compañero de viaje. Pregúntame lo que quieras o prueba una de estas:",
    trip_plan_label: "Planear una excursión de un día",
    suggest_image_label: "Imagina un destino",
    suggest_phrases_label: "Enséñame frases locales",
    trip_plan_reply: "Receta sencilla para un día: elige un barrio, desayuna en un sitio local, camina hasta un mirador o mercado, visita un museo o monumento en transporte público y termina con una cena reservada con antelación. Dime la ciudad y pongo lugares reales.",
    switch_confirmation: "Claro, seguimos en español.",
    failure_notice: "Lo siento, algo falló al responder. Inténtalo de nuevo.",
    style_offer: "¡Buena idea! ¿Qué estilo artístico uso?",
    image_safety: "No pude crear esa imagen porque el sistema de seguridad la marcó. Prueba a reformular la petición.",
    image_blocked_prefix: "La petición de imagen fue bloqueada: ",
    image_empty: "El servicio de imágenes no devolvió nada útil. Prueba con otro texto.",
    tips: &[
        "Consejo: el tren suele ganar al avión en trayectos cortos, en tiempo total y emisiones.",
        "Consejo: rellena una botella en vez de comprar agua.",
    ],
};

const FR: Strings = Strings {
    code: "fr-FR",
    welcome: "Bonjour ! Je suis votre compagnon de voyage. Posez-moi vos questions ou essayez ceci :",
    trip_plan_label: "Planifier une excursion d'une journée",
    suggest_image_label: "Imaginer une destination",
    suggest_phrases_label: "Apprends-moi des expressions locales",
    trip_plan_reply: "Recette simple pour une journée : choisissez un quartier, commencez par un petit-déjeuner local, marchez jusqu'à un point de vue ou un marché, visitez un musée en transports en commun, et finissez par un dîner réservé la veille. Donnez-moi la ville et je remplis avec de vrais lieux.",
    switch_confirmation: "Bien sûr, continuons en français.",
    failure_notice: "Désolé, une erreur s'est produite. Veuillez réessayer.",
    style_offer: "Bonne idée ! Quel style artistique ?",
    image_safety: "Je n'ai pas pu créer cette image : le système de sécurité l'a signalée. Essayez de reformuler.",
    image_blocked_prefix: "La demande d'image a été bloquée : ",
    image_empty: "Le service d'images n'a rien renvoyé d'utilisable. Essayez un autre texte.",
    tips: &[
        "Astuce : le train bat souvent l'avion sur les courts trajets, porte à porte comme en émissions.",
        "Astuce : remplissez une gourde plutôt que d'acheter de l'eau.",
    ],
};

const DE: Strings = Strings {
    code: "de-DE",
    welcome: "Hallo! Ich bin dein Reisebegleiter. Frag mich alles oder probiere eines davon:",
    trip_plan_label: "Einen Tagesausflug planen",
    suggest_image_label: "Ein Reiseziel ausmalen",
    suggest_phrases_label: "Bring mir lokale Redewendungen bei",
    trip_plan_reply: "Einfaches Tagesrezept: ein Viertel wählen, mit einem lokalen Frühstück starten, zu einem Aussichtspunkt oder Markt laufen, mit dem Nahverkehr ein Museum besuchen und mit einem vorab reservierten Abendessen abschließen. Nenn mir die Stadt, ich fülle echte Orte ein.",
    switch_confirmation: "Gern - weiter auf Deutsch.",
    failure_notice: "Entschuldigung, beim Antworten ist etwas schiefgelaufen. Bitte erneut versuchen.",
    style_offer: "Schöne Idee! Welcher Kunststil soll es sein?",
    image_safety: "Dieses Bild konnte nicht erstellt werden, da das Sicherheitssystem es markiert hat. Formuliere die Anfrage bitte um.",
    image_blocked_prefix: "Die Bildanfrage wurde blockiert: ",
    image_empty: "Der Bilddienst hat nichts Brauchbares geliefert. Bitte mit anderem Text versuchen.",
    tips: &[
        "Tipp: Auf Kurzstrecken schlägt die Bahn das Flugzeug oft in Zeit und Emissionen.",
        "Tipp: Flasche auffüllen statt Wasser kaufen.",
    ],
};

const JA: Strings = Strings {
    code: "ja-JP",
    welcome: "こんにちは！旅のパートナーです。何でも聞いてください。例えば：",
    trip_plan_label: "日帰り旅行を計画する",
    suggest_image_label: "行き先を絵にする",
    suggest_phrases_label: "現地のフレーズを教えて",
    trip_plan_reply: "シンプルな日帰りプラン：一つの地区を選び、地元の朝食から始め、市場や展望地まで歩き、公共交通で美術館か名所を一つ訪ね、前日に予約した夕食で締めくくります。都市名を教えてくれれば実際の場所を入れます。",
    switch_confirmation: "かしこまりました。これからは日本語で話しましょう。",
    failure_notice: "申し訳ありません、回答中に問題が発生しました。もう一度お試しください。",
    style_offer: "いいですね！どのアートスタイルにしますか？",
    image_safety: "安全システムにより、その画像は作成できませんでした。言い換えてお試しください。",
    image_blocked_prefix: "画像リクエストがブロックされました：",
    image_empty: "画像サービスから有効な結果が得られませんでした。別のプロンプトでお試しください。",
    tips: &[
        "ヒント：短距離なら鉄道のほうが所要時間も排出量も飛行機より有利なことが多いです。",
        "ヒント：水を買わずにボトルを補充しましょう。",
    ],
};

const TA: Strings = Strings {
    code: "ta-IN",
    welcome: "வணக்கம்! நான் உங்கள் பயணத் துணை. எதையும் கேளுங்கள், அல்லது இவற்றில் ஒன்றை முயற்சிக்கவும்:",
    trip_plan_label: "ஒரு நாள் பயணத் திட்டம்",
    suggest_image_label: "ஒரு இடத்தின் படம்",
    suggest_phrases_label: "உள்ளூர் சொற்றொடர்களை கற்றுத்தரவும்",
    trip_plan_reply: "எளிய ஒருநாள் திட்டம்: ஒரு பகுதியைத் தேர்ந்தெடுத்து, உள்ளூர் காலை உணவுடன் தொடங்கி, சந்தை அல்லது காட்சியிடம் வரை நடந்து, பொதுப் போக்குவரத்தில் ஒரு அருங்காட்சியகம் பார்த்து, முன்பதிவு செய்த இரவு உணவுடன் முடிக்கவும். நகரத்தைச் சொன்னால் உண்மையான இடங்களை நிரப்புகிறேன்.",
    switch_confirmation: "சரி - இனி தமிழில் பேசுவோம்.",
    failure_notice: "மன்னிக்கவும், பதிலளிக்கும் போது பிழை ஏற்பட்டது. மீண்டும் முயற்சிக்கவும்.",
    style_offer: "நல்ல யோசனை! எந்த கலை பாணியில் உருவாக்கட்டும்?",
    image_safety: "பாதுகாப்பு அமைப்பு தடுத்ததால் அந்தப் படத்தை உருவாக்க முடியவில்லை. வேறுவிதமாகக் கேட்டு பாருங்கள்.",
    image_blocked_prefix: "படக் கோரிக்கை தடுக்கப்பட்டது: ",
    image_empty: "படச் சேவை பயனுள்ள எதையும் தரவில்லை. வேறு உரையுடன் முயற்சிக்கவும்.",
    tips: &[
        "குறிப்பு: குறுந்தூரப் பயணங்களில் ரயில் பெரும்பாலும் விமானத்தை விட விரைவாகவும் குறைந்த மாசுடனும் இருக்கும்.",
        "குறிப்பு: தண்ணீர் வாங்குவதற்குப் பதிலாக பாட்டிலை நிரப்புங்கள்.",
    ],
};

const AR: Strings = Strings {
    code: "ar-AE",
    welcome: "مرحباً! أنا رفيقك في السفر. اسألني أي شيء أو جرّب واحدة من هذه:",
    trip_plan_label: "خطط لرحلة يوم واحد",
    suggest_image_label: "تخيّل وجهة",
    suggest_phrases_label: "علّمني عبارات محلية",
    trip_plan_reply: "وصفة بسيطة ليوم واحد: اختر حياً واحداً، ابدأ بفطور محلي، امشِ إلى سوق أو مطل، زر متحفاً أو معلماً بالمواصلات العامة، واختم بعشاء محجوز مسبقاً. أخبرني بالمدينة وسأملأ الأماكن الحقيقية.",
    switch_confirmation: "بالتأكيد - لنكمل بالعربية.",
    failure_notice: "عذراً، حدث خطأ أثناء الإجابة. يرجى المحاولة مرة أخرى.",
    style_offer: "فكرة جميلة! أي أسلوب فني تفضل؟",
    image_safety: "تعذر إنشاء هذه الصورة لأن نظام الأمان أشار إليها. حاول إعادة صياغة الطلب.",
    image_blocked_prefix: "تم حظر طلب الصورة: ",
    image_empty: "لم تُرجع خدمة الصور شيئاً مفيداً. جرّب نصاً مختلفاً.",
    tips: &[
        "نصيحة: القطار غالباً يتفوق على الطيران في الرحلات القصيرة وقتاً وانبعاثات.",
        "نصيحة: أعد تعبئة زجاجتك بدلاً من شراء الماء.",
    ],
};

const ALL_STRINGS: &[Strings] = &[EN, HI, ES, FR, DE, JA, TA, AR];

/// Canned strings for the given language code, falling back to English.
pub fn strings_for(code: &str) -> &'static Strings {
    ALL_STRINGS
        .iter()
        .find(|s| s.code == code)
        .unwrap_or(&ALL_STRINGS[0])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name_case_insensitive() {
        assert_eq!(find_by_name("hindi").unwrap().code, "hi-IN");
        assert_eq!(find_by_name("HINDI").unwrap().code, "hi-IN");
        assert_eq!(find_by_name(" Japanese ").unwrap().code, "ja-JP");
    }

    #[test]
    fn test_find_by_name_unknown() {
        assert!(find_by_name("Klingon").is_none());
        assert!(find_by_name("").is_none());
    }

    #[test]
    fn test_find_by_code() {
        assert_eq!(find_by_code("de-DE").unwrap().name, "German");
        assert!(find_by_code("xx-XX").is_none());
    }

    #[test]
    fn test_strings_for_known_codes() {
        for lang in SUPPORTED_LANGUAGES {
            let s = strings_for(lang.code);
            assert_eq!(s.code, lang.code);
        }
    }

    #[test]
    fn test_strings_for_unknown_falls_back_to_english() {
        let s = strings_for("xx-XX");
        assert_eq!(s.code, "en-US");
    }

    #[test]
    fn test_every_language_has_complete_strings() {
        for s in ALL_STRINGS {
            assert!(!s.welcome.is_empty(), "{}", s.code);
            assert!(!s.trip_plan_label.is_empty(), "{}", s.code);
            assert!(!s.trip_plan_reply.is_empty(), "{}", s.code);
            assert!(!s.switch_confirmation.is_empty(), "{}", s.code);
            assert!(!s.failure_notice.is_empty(), "{}", s.code);
            assert!(!s.style_offer.is_empty(), "{}", s.code);
            assert!(!s.image_safety.is_empty(), "{}", s.code);
            assert!(!s.image_blocked_prefix.is_empty(), "{}", s.code);
            assert!(!s.image_empty.is_empty(), "{}", s.code);
            assert!(!s.tips.is_empty(), "{}", s.code);
        }
    }

    #[test]
    fn test_trip_plan_labels_are_distinct() {
        // The router matches the trip-plan shortcut across all languages, so
        // labels must not collide.
        for (i, a) in ALL_STRINGS.iter().enumerate() {
            for b in ALL_STRINGS.iter().skip(i + 1) {
                assert_ne!(
                    a.trip_plan_label.to_lowercase(),
                    b.trip_plan_label.to_lowercase()
                );
            }
        }
    }

    #[test]
    fn test_supported_language_count() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), ALL_STRINGS.len());
    }
}
