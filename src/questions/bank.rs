//! The built-in SAT question table.
//!
//! Hand-authored entries keyed by topic and tags. Trigonometry is stocked at
//! Medium/Hard only, so requests for easy trig exercise the soft-difficulty
//! fallback instead of coming back empty.

use std::sync::LazyLock;

use super::{BankQuestion, Difficulty};

fn q(
    id: &str,
    topic: &str,
    tags: &[&str],
    difficulty: Difficulty,
    text: &str,
    options: [&str; 4],
    correct_answer: char,
    explanation: &str,
) -> BankQuestion {
    BankQuestion {
        id: id.to_string(),
        topic: topic.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        difficulty,
        text: text.to_string(),
        options: options.map(|o| o.to_string()),
        correct_answer,
        explanation: explanation.to_string(),
    }
}

static BANK: LazyLock<Vec<BankQuestion>> = LazyLock::new(|| {
    vec![
        q(
            "linear-001",
            "Linear Equations",
            &["math", "algebra", "linear equations"],
            Difficulty::Easy,
            "If 3x - 7 = 14, what is the value of 6x + 2?",
            ["40", "42", "44", "46"],
            'C',
            "Solve 3x - 7 = 14 to get x = 7, then substitute: 6(7) + 2 = 44.",
        ),
        q(
            "linear-002",
            "Linear Equations",
            &["math", "algebra", "linear equations", "slope"],
            Difficulty::Medium,
            "The line y = mx + 4 passes through the point (2, 10). What is the y-coordinate of the point on this line where x = 5?",
            ["15", "17", "19", "21"],
            'C',
            "From 10 = 2m + 4, the slope m = 3. At x = 5, y = 3(5) + 4 = 19.",
        ),
        q(
            "systems-001",
            "Systems of Equations",
            &["math", "algebra", "systems"],
            Difficulty::Medium,
            "If 2x + y = 11 and x - y = 1, what is the value of xy?",
            ["7", "12", "16", "28"],
            'B',
            "Adding the equations gives 3x = 12, so x = 4 and y = 3. Then xy = 12.",
        ),
        q(
            "quadratic-001",
            "Quadratic Equations",
            &["math", "algebra", "quadratics"],
            Difficulty::Medium,
            "If x\u{b2} - 6x + 8 = 0 and x > 3, what is the value of x?",
            ["2", "4", "6", "8"],
            'B',
            "The equation factors as (x - 2)(x - 4) = 0, giving x = 2 or x = 4. Only x = 4 satisfies x > 3.",
        ),
        q(
            "quadratic-002",
            "Quadratic Equations",
            &["math", "algebra", "quadratics", "parabola"],
            Difficulty::Hard,
            "The parabola y = x\u{b2} - 4x + k has its vertex on the x-axis. What is the value of k?",
            ["2", "4", "8", "16"],
            'B',
            "The vertex is at x = 2, where y = 4 - 8 + k = k - 4. A vertex on the x-axis means k - 4 = 0, so k = 4.",
        ),
        q(
            "exponents-001",
            "Exponents",
            &["math", "algebra", "exponents"],
            Difficulty::Easy,
            "If 2^x = 32, what is the value of x + 3?",
            ["7", "8", "9", "10"],
            'B',
            "Since 32 = 2^5, x = 5 and x + 3 = 8.",
        ),
        q(
            "percent-001",
            "Percentages",
            &["math", "arithmetic", "percent"],
            Difficulty::Easy,
            "A jacket priced at $80 is discounted by 25%, and then a 10% sales tax is applied to the discounted price. What is the final price?",
            ["$63.00", "$66.00", "$68.00", "$72.00"],
            'B',
            "The discount brings the price to 80 x 0.75 = $60. Adding 10% tax gives 60 x 1.10 = $66.",
        ),
        q(
            "ratio-001",
            "Ratios and Proportions",
            &["math", "arithmetic", "ratios"],
            Difficulty::Medium,
            "The ratio of red to blue marbles in a jar is 3:5. If the jar holds 40 marbles in total, how many more blue marbles than red marbles are there?",
            ["5", "8", "10", "15"],
            'C',
            "Each ratio unit is 40 / 8 = 5 marbles, so there are 15 red and 25 blue. The difference is 10.",
        ),
        q(
            "functions-001",
            "Functions",
            &["math", "algebra", "functions", "composition"],
            Difficulty::Medium,
            "If f(x) = 2x\u{b2} - 3 and g(x) = x + 4, what is f(g(-2))?",
            ["1", "5", "11", "29"],
            'B',
            "First g(-2) = 2, then f(2) = 2(4) - 3 = 5.",
        ),
        q(
            "stats-001",
            "Statistics",
            &["math", "data analysis", "mean"],
            Difficulty::Medium,
            "The mean of five numbers is 12. When a sixth number is added to the list, the mean becomes 14. What is the sixth number?",
            ["16", "20", "24", "26"],
            'C',
            "The five numbers sum to 60; six numbers with mean 14 sum to 84. The sixth number is 84 - 60 = 24.",
        ),
        q(
            "prob-001",
            "Probability",
            &["math", "data analysis", "probability"],
            Difficulty::Medium,
            "A bag contains 4 green and 6 yellow tokens. Two tokens are drawn at random without replacement. What is the probability that both are green?",
            ["2/15", "4/25", "1/5", "2/9"],
            'A',
            "P(first green) = 4/10 and P(second green) = 3/9, so the probability is (4/10)(3/9) = 2/15.",
        ),
        q(
            "geometry-001",
            "Geometry",
            &["math", "geometry", "rectangles", "area"],
            Difficulty::Easy,
            "A rectangle has a perimeter of 36 and a length of 10. What is its area?",
            ["60", "72", "80", "90"],
            'C',
            "The width is (36 - 2 x 10) / 2 = 8, so the area is 10 x 8 = 80.",
        ),
        q(
            "geometry-002",
            "Geometry",
            &["math", "geometry", "circles", "arc length"],
            Difficulty::Medium,
            "In a circle with radius 6, a central angle of 60 degrees subtends an arc. What is the length of that arc?",
            ["\u{3c0}", "2\u{3c0}", "3\u{3c0}", "6\u{3c0}"],
            'B',
            "The circumference is 12\u{3c0}, and 60 degrees is one sixth of the circle, so the arc length is 2\u{3c0}.",
        ),
        q(
            "geometry-003",
            "Geometry",
            &["math", "geometry", "triangles", "similarity"],
            Difficulty::Hard,
            "A right triangle has legs of length 5 and 12. A similar triangle has a hypotenuse of length 39. What is the perimeter of the larger triangle?",
            ["78", "84", "90", "117"],
            'C',
            "The small triangle's hypotenuse is 13, so the scale factor is 3. The larger triangle has sides 15, 36, and 39, for a perimeter of 90.",
        ),
        q(
            "trig-001",
            "Trigonometry",
            &["math", "trigonometry", "right triangles"],
            Difficulty::Medium,
            "In a right triangle, the side opposite angle \u{3b8} has length 8 and the hypotenuse has length 17. What is cos \u{3b8}?",
            ["8/17", "15/17", "8/15", "17/15"],
            'B',
            "By the Pythagorean theorem the adjacent side is 15, so cos \u{3b8} = 15/17.",
        ),
        q(
            "trig-002",
            "Trigonometry",
            &["math", "trigonometry", "right triangles"],
            Difficulty::Medium,
            "If sin \u{3b8} = 3/5 and \u{3b8} is an acute angle, what is tan \u{3b8}?",
            ["3/4", "4/3", "3/5", "4/5"],
            'A',
            "With sin \u{3b8} = 3/5, cos \u{3b8} = 4/5 for an acute angle, so tan \u{3b8} = (3/5)/(4/5) = 3/4.",
        ),
        q(
            "trig-003",
            "Trigonometry",
            &["math", "trigonometry", "unit circle"],
            Difficulty::Hard,
            "What is the value of sin(225\u{b0})?",
            ["\u{221a}2/2", "-\u{221a}2/2", "1/2", "-1/2"],
            'B',
            "225\u{b0} lies in the third quadrant with reference angle 45\u{b0}, where sine is negative: sin(225\u{b0}) = -\u{221a}2/2.",
        ),
        q(
            "trig-004",
            "Trigonometry",
            &["math", "trigonometry", "right triangles"],
            Difficulty::Hard,
            "In right triangle ABC with the right angle at C, sin A = 5/13 and the hypotenuse has length 26. What is the length of the side adjacent to angle A?",
            ["10", "12", "24", "25"],
            'C',
            "sin A = 5/13 gives cos A = 12/13, so the adjacent side is 26 x 12/13 = 24.",
        ),
        q(
            "grammar-001",
            "Grammar",
            &["english", "writing", "subject-verb agreement"],
            Difficulty::Easy,
            "Choose the option that best completes the sentence: \"Each of the students ___ responsible for bringing a calculator.\"",
            ["are", "is", "were", "have been"],
            'B',
            "\"Each\" is a singular subject, so it takes the singular verb \"is\"; the phrase \"of the students\" does not change the agreement.",
        ),
        q(
            "grammar-002",
            "Grammar",
            &["english", "writing", "subject-verb agreement"],
            Difficulty::Medium,
            "Choose the option that best completes the sentence: \"Neither the coach nor the players ___ willing to reschedule the match.\"",
            ["is", "was", "were", "has been"],
            'C',
            "With \"neither...nor\", the verb agrees with the nearer subject. \"Players\" is plural, so \"were\" is correct.",
        ),
        q(
            "punct-001",
            "Punctuation",
            &["english", "writing", "colons"],
            Difficulty::Easy,
            "Which revision best corrects the sentence: \"The exam covers three subjects reading writing and math.\"",
            [
                "The exam covers three subjects: reading, writing, and math.",
                "The exam covers three subjects, reading, writing and math.",
                "The exam covers three subjects; reading, writing, and math.",
                "The exam covers three subjects reading, writing, and math.",
            ],
            'A',
            "A colon introduces the list after a complete clause, and commas separate the list items.",
        ),
        q(
            "vocab-001",
            "Vocabulary in Context",
            &["english", "reading", "vocabulary"],
            Difficulty::Medium,
            "As used in the sentence \"The results of the experiment were so novel that the committee asked the team to repeat it,\" the word \"novel\" most nearly means:",
            ["fictional", "lengthy", "new", "entertaining"],
            'C',
            "In this context \"novel\" describes findings that are unprecedented, i.e. new; the noun sense of \"novel\" (a work of fiction) does not fit.",
        ),
        q(
            "reading-001",
            "Reading Comprehension",
            &["english", "reading", "inference"],
            Difficulty::Medium,
            "\"Although the harbor town had grown quiet in winter, Mara found the stillness clarifying rather than lonely.\" The sentence suggests that Mara views the town's quiet as:",
            [
                "an obstacle to her work",
                "a welcome aid to thought",
                "a sign of the town's decline",
                "a reason to leave",
            ],
            'B',
            "\"Clarifying rather than lonely\" frames the stillness positively, as something that helps her think.",
        ),
        q(
            "reading-002",
            "Reading Comprehension",
            &["english", "reading", "inference", "tone"],
            Difficulty::Hard,
            "\"The committee praised the proposal's ambition even as it questioned whether the budget could survive contact with reality.\" The phrase \"survive contact with reality\" most strongly conveys the committee's:",
            [
                "confidence in the proposal's funding",
                "doubt that the projected costs are realistic",
                "belief that the proposal lacks ambition",
                "intention to reject the proposal outright",
            ],
            'B',
            "The phrase casts the budget as untested against real conditions, signaling skepticism about the cost projections.",
        ),
    ]
});

/// All bank entries.
pub fn all() -> &'static [BankQuestion] {
    &BANK
}
